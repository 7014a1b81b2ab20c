//! Medium articles, rendered in a browser session.

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;
use tracing::info;

use crawl_harness_core::{ArticleDocument, Content, Repository};

use crate::browser::{BrowserCrawler, BrowserSession};
use crate::crawler::{already_exists, network_location, CrawlContext, CrawlerServices, ExtractionError};
use crate::extract::{first_text, select_first, visible_text};

pub struct MediumCrawler {
    articles: Repository<ArticleDocument>,
}

impl MediumCrawler {
    pub fn new(services: &CrawlerServices) -> Self {
        Self {
            articles: services.repository(),
        }
    }
}

/// Title, subtitle, and body text of a rendered Medium story.
///
/// A page with neither a heading nor any body text is a parse failure.
pub fn parse_story(link: &str, html: &str) -> Result<Content, ExtractionError> {
    let doc = Html::parse_document(html);
    let title = first_text(&doc, "h1.pw-post-title").or_else(|| first_text(&doc, "h1"));
    let subtitle = first_text(&doc, "h2.pw-subtitle-paragraph");
    let body = select_first(&doc, "body")
        .map(visible_text)
        .unwrap_or_default();
    if title.is_none() && body.trim().is_empty() {
        return Err(ExtractionError::Parse {
            link: link.to_string(),
            reason: "page has no title and no text".to_string(),
        });
    }

    let mut content = Content::new();
    content.insert("Title".into(), title.map(Value::String).unwrap_or(Value::Null));
    content.insert(
        "Subtitle".into(),
        subtitle.map(Value::String).unwrap_or(Value::Null),
    );
    content.insert("Content".into(), Value::String(body));
    Ok(content)
}

#[async_trait]
impl BrowserCrawler for MediumCrawler {
    fn name(&self) -> &str {
        "medium"
    }

    async fn already_crawled(&self, link: &str) -> Result<bool, ExtractionError> {
        already_exists(&self.articles, link).await
    }

    async fn crawl(
        &self,
        session: &mut BrowserSession,
        link: &str,
        ctx: &CrawlContext,
    ) -> Result<(), ExtractionError> {
        info!(link, "Starting scraping Medium article");
        let platform = network_location(link)?;

        session.navigate(link).await?;
        session.scroll_page().await?;
        let html = session.page_source().await?;
        let content = parse_story(link, &html)?;

        self.articles
            .save(ArticleDocument::new(content, link, &platform, &ctx.user))
            .await?;
        info!(link, "Successfully scraped and saved article");
        Ok(())
    }
}
