//! Error types shared by the store and repository layers.

use thiserror::Error;

/// A document type is missing its storage binding.
///
/// Raised whenever a repository is asked for the collection of a
/// [`Document`](crate::models::Document) that never declared one. Never
/// recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("document type `{document}` does not declare a collection name")]
    MissingCollection { document: &'static str },
}

/// Failure reported by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A single insert was rejected (duplicate key, invalid record).
    #[error("write to '{collection}' rejected: {reason}")]
    Write { collection: String, reason: String },

    /// An ordered bulk insert stopped part-way. The first `inserted`
    /// documents were written and are not rolled back.
    #[error("bulk write to '{collection}' stopped after {inserted} of {attempted} documents: {reason}")]
    BulkWrite {
        collection: String,
        inserted: usize,
        attempted: usize,
        reason: String,
    },

    /// A lookup could not be executed.
    #[error("query on '{collection}' failed: {reason}")]
    Query { collection: String, reason: String },

    /// A stored record could not be mapped back to its entity type.
    #[error("malformed document in '{collection}': {reason}")]
    Malformed { collection: String, reason: String },
}

/// Error returned by [`Repository`](crate::repository::Repository) operations.
///
/// Store failures have already been logged when this is returned; callers
/// pick their own policy. Configuration failures are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepositoryError {
    /// True when the failure comes from a missing binding rather than the store.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RepositoryError::Configuration(_))
    }
}
