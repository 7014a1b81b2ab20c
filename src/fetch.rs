//! Plain HTTP page fetching for strategies that do not need a browser.

use async_trait::async_trait;
use tracing::debug;

use crate::config::CrawlerConfig;
use crate::crawler::ExtractionError;

/// Fetch a page's HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, link: &str) -> Result<String, ExtractionError>;
}

/// [`PageFetcher`] backed by a `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, link: &str) -> Result<String, ExtractionError> {
        let fetch_error = |e: reqwest::Error| ExtractionError::Fetch {
            link: link.to_string(),
            reason: e.to_string(),
        };

        let resp = self.client.get(link).send().await.map_err(fetch_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractionError::Fetch {
                link: link.to_string(),
                reason: format!("HTTP {}", status),
            });
        }
        let body = resp.text().await.map_err(fetch_error)?;
        debug!(link, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
