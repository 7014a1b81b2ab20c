//! # Crawl Harness Core
//!
//! Storage-side logic for Crawl Harness: typed document entities, the
//! [`store::DocumentStore`] boundary, an in-memory store, and the generic
//! [`repository::Repository`] that maps entities to and from store records.
//!
//! This crate performs no network or filesystem I/O of its own. Concrete
//! store clients (SQLite, remote document databases) live in the runtime
//! crate and plug in through [`store::DocumentStore`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Document entities and the [`models::Document`] trait |
//! | [`store`] | Store-client trait, filters, in-memory backend |
//! | [`repository`] | Generic save / find / bulk / get-or-create |
//! | [`error`] | Configuration, store, and repository errors |

pub mod error;
pub mod models;
pub mod repository;
pub mod store;

pub use error::{ConfigurationError, RepositoryError, StoreError};
pub use models::{
    ArticleDocument, Content, DataCategory, Document, PostDocument, RepositoryDocument,
    UserDocument,
};
pub use repository::Repository;
