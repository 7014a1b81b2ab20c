//! Default strategy for arbitrary article pages.
//!
//! Fetches the page over plain HTTP, extracts its title, description,
//! language, and visible text, and stores the result as an
//! [`ArticleDocument`] whose platform is the link's network location.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crawl_harness_core::{ArticleDocument, Repository};

use crate::crawler::{
    already_exists, network_location, CrawlContext, Crawler, CrawlerServices, ExtractionError,
};
use crate::extract::extract_page;
use crate::fetch::PageFetcher;

pub struct ArticleCrawler {
    fetcher: Arc<dyn PageFetcher>,
    articles: Repository<ArticleDocument>,
}

impl ArticleCrawler {
    pub fn new(services: &CrawlerServices) -> Self {
        Self {
            fetcher: Arc::clone(&services.fetcher),
            articles: services.repository(),
        }
    }
}

#[async_trait]
impl Crawler for ArticleCrawler {
    fn name(&self) -> &str {
        "article"
    }

    async fn extract(&self, link: &str, ctx: &CrawlContext) -> Result<(), ExtractionError> {
        if already_exists(&self.articles, link).await? {
            return Ok(());
        }

        info!(link, "Starting scraping article");
        let platform = network_location(link)?;
        let html = self.fetcher.fetch(link).await?;
        let content = extract_page(&html).into_content();

        self.articles
            .save(ArticleDocument::new(content, link, &platform, &ctx.user))
            .await?;
        info!(link, "Finished scraping custom article");
        Ok(())
    }
}
