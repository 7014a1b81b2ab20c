//! Batch link ingestion.
//!
//! Works through a list of links strictly in order: each link is resolved,
//! extracted, and persisted before the next begins. A failing link is
//! logged and counted against its domain; the batch carries on. Only a
//! fatal (configuration) error stops the batch early.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{error, info};

use crawl_harness_core::{Repository, UserDocument};

use crate::config::Config;
use crate::crawler::{network_location, CrawlContext, CrawlerServices, ExtractionError};
use crate::dispatcher::CrawlerDispatcher;
use crate::fetch::HttpFetcher;
use crate::progress::{CrawlProgressEvent, CrawlProgressReporter, ProgressMode};
use crate::sqlite_store::SqliteDocumentStore;
use crate::users::get_or_create_user;
use crate::webdriver::WebDriverLauncher;

/// Per-domain counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DomainStats {
    pub successful: u64,
    pub total: u64,
}

/// Outcome of one `crawl_links` batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub links: Vec<String>,
    pub successful: u64,
    pub total: u64,
    /// Keyed by network location; links without one count under `""`.
    pub domains: BTreeMap<String, DomainStats>,
}

impl CrawlReport {
    fn record(&mut self, domain: String, success: bool) {
        let stats = self.domains.entry(domain).or_default();
        stats.total += 1;
        self.total += 1;
        if success {
            stats.successful += 1;
            self.successful += 1;
        }
    }
}

/// Extract every link on behalf of `ctx.user`.
pub async fn crawl_links(
    dispatcher: &CrawlerDispatcher,
    ctx: &CrawlContext,
    links: &[String],
    progress: &dyn CrawlProgressReporter,
) -> Result<CrawlReport, ExtractionError> {
    info!(count = links.len(), "Starting to crawl links");
    let total = links.len() as u64;
    let mut report = CrawlReport {
        links: links.to_vec(),
        ..Default::default()
    };

    for (i, link) in links.iter().enumerate() {
        let n = i as u64 + 1;
        let domain = network_location(link).unwrap_or_default();

        let result = match dispatcher.resolve(link) {
            Ok(crawler) => {
                progress.report(CrawlProgressEvent::Crawling {
                    link: link.clone(),
                    crawler: crawler.name().to_string(),
                    n,
                    total,
                });
                crawler.extract(link, ctx).await
            }
            Err(e) => Err(e),
        };

        let success = match result {
            Ok(()) => true,
            Err(e) if e.is_fatal() => {
                error!(link, error = %e, "Aborting crawl");
                return Err(e);
            }
            Err(e) => {
                error!(link, error = %e, "An error occurred while crawling");
                false
            }
        };
        report.record(domain, success);
        progress.report(CrawlProgressEvent::Finished {
            link: link.clone(),
            success,
            n,
            total,
        });
    }

    info!(
        successful = report.successful,
        total = report.total,
        "Successfully crawled {} / {} links",
        report.successful,
        report.total
    );
    Ok(report)
}

/// Parse a links file: one link per line, blank lines and `#` comments skipped.
pub fn parse_links(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_links_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read links file: {}", path.display()))?;
    Ok(parse_links(&text))
}

/// `crawl links`: resolve the user, crawl every link, print the report.
pub async fn run_links(
    config: &Config,
    user_full_name: &str,
    links: Vec<String>,
    mode: ProgressMode,
) -> anyhow::Result<()> {
    if links.is_empty() {
        anyhow::bail!("No links given. Pass links as arguments or with --file.");
    }

    let store = SqliteDocumentStore::open(config).await?;
    let pool = store.pool().clone();
    let services = CrawlerServices {
        store: Arc::new(store),
        config: Arc::new(config.clone()),
        fetcher: Arc::new(HttpFetcher::new(&config.crawler)?),
        browser: Arc::new(WebDriverLauncher::new(&config.crawler)?),
    };

    let users = Repository::<UserDocument>::new(Arc::clone(&services.store));
    let (user, _) = get_or_create_user(&users, user_full_name).await?;

    let dispatcher = CrawlerDispatcher::with_builtins(services);
    let progress = mode.reporter();
    let result = crawl_links(&dispatcher, &CrawlContext::new(user), &links, progress.as_ref()).await;
    pool.close().await;

    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_file_skips_comments_and_blanks() {
        let links = parse_links("# reading list\nhttps://medium.com/@x/a\n\n  https://github.com/x/y  \n");
        assert_eq!(links, vec!["https://medium.com/@x/a", "https://github.com/x/y"]);
    }

    #[test]
    fn record_counts_per_domain() {
        let mut report = CrawlReport::default();
        report.record("medium.com".into(), true);
        report.record("medium.com".into(), false);
        report.record("github.com".into(), true);

        assert_eq!(report.successful, 2);
        assert_eq!(report.total, 3);
        assert_eq!(
            report.domains["medium.com"],
            DomainStats {
                successful: 1,
                total: 2
            }
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["domains"]["github.com"]["successful"], 1);
    }
}
