//! LinkedIn activity feeds, rendered in an authenticated browser session.
//!
//! Signs in through the `login` hook, scrolls the page to load the feed,
//! then stores each post as a [`PostDocument`] with a single bulk insert.

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;
use tracing::{info, warn};

use crawl_harness_core::{Content, PostDocument, Repository};

use crate::browser::{BrowserCrawler, BrowserSession, ChromeOptions};
use crate::config::LinkedInConfig;
use crate::crawler::{already_exists, network_location, CrawlContext, CrawlerServices, ExtractionError};
use crate::extract::{select_all, visible_text};

const LOGIN_URL: &str = "https://www.linkedin.com/login";

/// One post pulled from a rendered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub text: String,
    pub image: Option<String>,
}

pub struct LinkedInCrawler {
    posts: Repository<PostDocument>,
    linkedin: LinkedInConfig,
}

impl LinkedInCrawler {
    pub fn new(services: &CrawlerServices) -> Self {
        Self {
            posts: services.repository(),
            linkedin: services.config.linkedin.clone(),
        }
    }
}

/// Posts in feed order. Images are paired with posts by position.
pub fn parse_feed(html: &str) -> Vec<FeedPost> {
    let doc = Html::parse_document(html);
    let images: Vec<String> = select_all(&doc, "button.update-components-image__image-link img")
        .into_iter()
        .filter_map(|img| img.value().attr("src").map(str::to_string))
        .collect();

    select_all(&doc, "div.update-components-text")
        .into_iter()
        .map(visible_text)
        .enumerate()
        .map(|(i, text)| FeedPost {
            text,
            image: images.get(i).cloned(),
        })
        .collect()
}

/// Script filling the login form and submitting it.
fn login_script(username: &str, password: &str) -> String {
    // JSON string literals are valid JS string literals.
    format!(
        "document.getElementById('username').value = {};\n\
         document.getElementById('password').value = {};\n\
         document.querySelector('.login__form_action_container button').click();",
        Value::from(username),
        Value::from(password),
    )
}

#[async_trait]
impl BrowserCrawler for LinkedInCrawler {
    fn name(&self) -> &str {
        "linkedin"
    }

    fn set_extra_driver_options(&self, options: &mut ChromeOptions) {
        options.add_argument("--window-size=1920,1080");
    }

    async fn login(&self, session: &mut BrowserSession) -> Result<(), ExtractionError> {
        let (username, password) = self.linkedin.credentials().ok_or_else(|| {
            ExtractionError::Login(
                "LinkedIn credentials not configured (linkedin.username / linkedin.password)"
                    .to_string(),
            )
        })?;

        session.navigate(LOGIN_URL).await?;
        session
            .execute_script(&login_script(&username, &password))
            .await
            .map_err(|e| ExtractionError::Login(e.to_string()))?;
        tokio::time::sleep(session.pause()).await;
        Ok(())
    }

    async fn already_crawled(&self, link: &str) -> Result<bool, ExtractionError> {
        already_exists(&self.posts, link).await
    }

    async fn crawl(
        &self,
        session: &mut BrowserSession,
        link: &str,
        ctx: &CrawlContext,
    ) -> Result<(), ExtractionError> {
        info!(link, "Starting scraping LinkedIn posts");
        let platform = network_location(link)?;

        session.navigate(link).await?;
        tokio::time::sleep(session.pause()).await;
        session.scroll_page().await?;
        let html = session.page_source().await?;

        let posts = parse_feed(&html);
        if posts.is_empty() {
            warn!(link, "No posts found");
            return Ok(());
        }

        let documents: Vec<PostDocument> = posts
            .into_iter()
            .map(|post| {
                let mut content = Content::new();
                content.insert("text".into(), Value::String(post.text));
                PostDocument::new(content, post.image, link, &platform, &ctx.user)
            })
            .collect();
        let count = documents.len();
        self.posts.bulk_insert(documents).await?;
        info!(link, count, "Finished scraping LinkedIn posts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_images_by_position() {
        let posts = parse_feed(
            r#"<html><body>
                <div class="update-components-text"><span>First post</span></div>
                <button class="update-components-image__image-link"><img src="https://img/1.png"></button>
                <div class="update-components-text">Second post</div>
            </body></html>"#,
        );
        assert_eq!(
            posts,
            vec![
                FeedPost {
                    text: "First post".into(),
                    image: Some("https://img/1.png".into())
                },
                FeedPost {
                    text: "Second post".into(),
                    image: None
                },
            ]
        );
    }

    #[test]
    fn login_script_escapes_credentials() {
        let script = login_script("me@example.com", "p'a\"ss");
        assert!(script.contains(r#"= "me@example.com";"#));
        assert!(script.contains(r#"= "p'a\"ss";"#));
    }
}
