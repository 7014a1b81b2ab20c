//! The extraction-strategy capability.
//!
//! A [`Crawler`] turns one link into one or more persisted documents. Every
//! implementation is idempotent: it looks the link up in its repository
//! first and returns without fetching anything when a document already
//! exists. On a miss it fetches, transforms, and saves.
//!
//! ```text
//! link ──▶ Repository::find_by_link ──hit──▶ "already exists", return
//!                │
//!               miss
//!                ▼
//!        fetch / transform ──▶ Repository::save
//! ```
//!
//! Strategies are built through a [`CrawlerServices`] bundle so the store,
//! configuration, page fetcher, and browser launcher are passed explicitly
//! rather than read from globals.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crawl_harness_core::store::DocumentStore;
use crawl_harness_core::{Document, Repository, RepositoryError, UserDocument};

use crate::browser::BrowserLauncher;
use crate::config::Config;
use crate::fetch::PageFetcher;

/// Unrecoverable failure while extracting a link.
///
/// Propagated to the batch loop, which records it and moves on.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("invalid link '{link}': {reason}")]
    InvalidLink { link: String, reason: String },

    #[error("failed to fetch {link}: {reason}")]
    Fetch { link: String, reason: String },

    #[error("failed to parse {link}: {reason}")]
    Parse { link: String, reason: String },

    #[error("browser session failed: {0}")]
    Browser(String),

    #[error("login failed: {0}")]
    Login(String),

    #[error("git failed: {0}")]
    Git(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Configuration errors abort the batch instead of failing one link.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractionError::Repository(e) if e.is_fatal())
    }
}

/// Per-call context handed to [`Crawler::extract`].
#[derive(Debug, Clone)]
pub struct CrawlContext {
    /// The user on whose behalf content is ingested.
    pub user: UserDocument,
}

impl CrawlContext {
    pub fn new(user: UserDocument) -> Self {
        Self { user }
    }
}

/// A content-family extraction strategy.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Short identifier (e.g. `"medium"`, `"article"`).
    fn name(&self) -> &str;

    /// Extract `link` and persist the result unless it already exists.
    async fn extract(&self, link: &str, ctx: &CrawlContext) -> Result<(), ExtractionError>;
}

/// Everything a strategy needs to be constructed.
#[derive(Clone)]
pub struct CrawlerServices {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub browser: Arc<dyn BrowserLauncher>,
}

impl CrawlerServices {
    pub fn repository<T: Document>(&self) -> Repository<T> {
        Repository::new(Arc::clone(&self.store))
    }
}

/// Network location (`host[:port]`) of a link.
pub fn network_location(link: &str) -> Result<String, ExtractionError> {
    let url = url::Url::parse(link).map_err(|e| ExtractionError::InvalidLink {
        link: link.to_string(),
        reason: e.to_string(),
    })?;
    let host = url.host_str().ok_or_else(|| ExtractionError::InvalidLink {
        link: link.to_string(),
        reason: "link has no host".to_string(),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Returns true (and logs) when `repository` already holds a document for `link`.
pub async fn already_exists<T: Document>(
    repository: &Repository<T>,
    link: &str,
) -> Result<bool, ExtractionError> {
    if repository.find_by_link(link).await?.is_some() {
        info!(link, collection = T::COLLECTION.unwrap_or("?"), "Document already exists");
        return Ok(true);
    }
    Ok(false)
}
