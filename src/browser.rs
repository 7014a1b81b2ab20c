//! Browser-session strategies.
//!
//! Some sites only render their content inside a real browser and load it
//! progressively as the page is scrolled. This module provides:
//!
//! - [`ChromeOptions`]: the fixed headless flag set plus isolated,
//!   per-instance temp directories.
//! - [`BrowserDriver`] / [`BrowserLauncher`]: the opaque automation
//!   capability ("navigate, run script, read the DOM").
//! - [`BrowserSession`]: an exclusive session guard. The driver is released
//!   when the guard is closed or dropped, so no exit path leaks it.
//! - [`scroll_page`]: the scroll-until-stable loop.
//! - [`BrowserCrawler`] + [`BrowserSessionCrawler`]: adapts a browser-based
//!   strategy to the [`Crawler`] interface with dedup, login, and session
//!   scoping handled once.
//!
//! # Scroll-until-stable
//!
//! ```text
//!            ┌──────────── height grew, under limit ───────────┐
//!            ▼                                                 │
//!   H0 ─▶ SCROLLING ── scroll, pause, read H1 ──┬── H1 == H0 ──▶ STABLE
//!                                               └── scrolls ≥ limit ──▶ LIMIT_REACHED
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::CrawlerConfig;
use crate::crawler::{CrawlContext, Crawler, CrawlerServices, ExtractionError};

const PAGE_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight";
const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Flags every browser session starts with, in order.
pub const BASE_FLAGS: &[&str] = &[
    "--no-sandbox",
    "--headless",
    "--disable-dev-shm-usage",
    "--log-level=3",
    "--disable-popup-blocking",
    "--disable-notifications",
    "--disable-extensions",
    "--disable-background-networking",
    "--ignore-certificate-errors",
];

/// Launch configuration for one browser session.
///
/// Owns the temp directories it points the browser at; they are removed
/// when the options are dropped.
#[derive(Debug)]
pub struct ChromeOptions {
    args: Vec<String>,
    _dirs: Vec<TempDir>,
}

impl ChromeOptions {
    /// The fixed flag set with fresh user-data, data, and cache directories.
    pub fn new(remote_debugging_port: u16) -> std::io::Result<Self> {
        let user_data = TempDir::new()?;
        let data = TempDir::new()?;
        let cache = TempDir::new()?;

        let mut args: Vec<String> = BASE_FLAGS.iter().map(|f| f.to_string()).collect();
        args.push(format!("--user-data-dir={}", user_data.path().display()));
        args.push(format!("--data-path={}", data.path().display()));
        args.push(format!("--disk-cache-dir={}", cache.path().display()));
        args.push(format!("--remote-debugging-port={}", remote_debugging_port));

        Ok(Self {
            args,
            _dirs: vec![user_data, data, cache],
        })
    }

    pub fn add_argument(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// A live browser under automation.
///
/// Implementations must release the browser in `Drop` as well as in
/// [`quit`](BrowserDriver::quit). `Drop` cannot await, so release there is
/// best-effort: a panic or a cancelled future skips the orderly shutdown that
/// `quit` performs.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), ExtractionError>;

    /// Run `script` in the page and return its result.
    async fn execute_script(&mut self, script: &str) -> Result<Value, ExtractionError>;

    async fn page_source(&mut self) -> Result<String, ExtractionError>;

    async fn quit(&mut self) -> Result<(), ExtractionError>;
}

/// Starts browser drivers.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &ChromeOptions) -> Result<Box<dyn BrowserDriver>, ExtractionError>;
}

/// Bound on scroll iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    /// `None` scrolls until stable; `Some(0)` allows a single scroll.
    pub limit: Option<u32>,
    /// Pause after each scroll, rate-limiting requests and letting content load.
    pub pause: Duration,
}

impl From<&CrawlerConfig> for ScrollSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            limit: config.scroll_limit,
            pause: config.scroll_pause(),
        }
    }
}

/// Terminal state of [`scroll_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// The page height stopped changing.
    Stable { scrolls: u32 },
    /// The limit was hit while the page was still growing.
    LimitReached { scrolls: u32 },
}

impl ScrollOutcome {
    pub fn scrolls(&self) -> u32 {
        match self {
            ScrollOutcome::Stable { scrolls } | ScrollOutcome::LimitReached { scrolls } => *scrolls,
        }
    }
}

async fn page_height(driver: &mut dyn BrowserDriver) -> Result<u64, ExtractionError> {
    let value = driver.execute_script(PAGE_HEIGHT_SCRIPT).await?;
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|h| h.max(0.0) as u64))
        .ok_or_else(|| ExtractionError::Browser(format!("page height is not a number: {}", value)))
}

/// Scroll to the bottom until the page height stops changing or the limit
/// is reached.
///
/// Each iteration blocks the caller for `settings.pause`.
pub async fn scroll_page(
    driver: &mut dyn BrowserDriver,
    settings: ScrollSettings,
) -> Result<ScrollOutcome, ExtractionError> {
    let mut scrolls = 0u32;
    let mut last_height = page_height(driver).await?;

    loop {
        driver.execute_script(SCROLL_TO_BOTTOM_SCRIPT).await?;
        scrolls += 1;
        tokio::time::sleep(settings.pause).await;
        let new_height = page_height(driver).await?;

        if new_height == last_height {
            return Ok(ScrollOutcome::Stable { scrolls });
        }
        if let Some(limit) = settings.limit {
            if scrolls >= limit {
                return Ok(ScrollOutcome::LimitReached { scrolls });
            }
        }
        debug!(scrolls, last_height, new_height, "Page grew, scrolling again");
        last_height = new_height;
    }
}

/// Exclusive guard over one browser driver.
pub struct BrowserSession {
    driver: Option<Box<dyn BrowserDriver>>,
    scroll: ScrollSettings,
}

impl BrowserSession {
    pub async fn open(
        launcher: &dyn BrowserLauncher,
        options: &ChromeOptions,
        scroll: ScrollSettings,
    ) -> Result<Self, ExtractionError> {
        let driver = launcher.launch(options).await?;
        Ok(Self {
            driver: Some(driver),
            scroll,
        })
    }

    fn driver(&mut self) -> Result<&mut (dyn BrowserDriver + 'static), ExtractionError> {
        self.driver
            .as_deref_mut()
            .ok_or_else(|| ExtractionError::Browser("session already closed".to_string()))
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), ExtractionError> {
        self.driver()?.navigate(url).await
    }

    pub async fn execute_script(&mut self, script: &str) -> Result<Value, ExtractionError> {
        self.driver()?.execute_script(script).await
    }

    pub async fn page_source(&mut self) -> Result<String, ExtractionError> {
        self.driver()?.page_source().await
    }

    /// The configured wait between page interactions.
    pub fn pause(&self) -> Duration {
        self.scroll.pause
    }

    /// Run [`scroll_page`] with this session's settings.
    pub async fn scroll_page(&mut self) -> Result<ScrollOutcome, ExtractionError> {
        let settings = self.scroll;
        let outcome = scroll_page(self.driver()?, settings).await?;
        debug!(?outcome, "Scrolling finished");
        Ok(outcome)
    }

    /// Quit the browser. Dropping the session releases it as well.
    pub async fn close(mut self) -> Result<(), ExtractionError> {
        match self.driver.take() {
            Some(mut driver) => driver.quit().await,
            None => Ok(()),
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if self.driver.take().is_some() {
            debug!("Browser session released on drop");
        }
    }
}

/// A strategy that works inside a browser session.
#[async_trait]
pub trait BrowserCrawler: Send + Sync {
    fn name(&self) -> &str;

    /// Add strategy-specific launch flags.
    fn set_extra_driver_options(&self, _options: &mut ChromeOptions) {}

    /// Authenticate before extraction. No-op by default.
    async fn login(&self, _session: &mut BrowserSession) -> Result<(), ExtractionError> {
        Ok(())
    }

    /// True when a document for `link` is already stored.
    async fn already_crawled(&self, link: &str) -> Result<bool, ExtractionError>;

    /// Extract and persist `link` using the open session.
    async fn crawl(
        &self,
        session: &mut BrowserSession,
        link: &str,
        ctx: &CrawlContext,
    ) -> Result<(), ExtractionError>;
}

/// Adapts a [`BrowserCrawler`] to [`Crawler`].
///
/// Launch options are fixed at construction. A session is opened only after
/// the dedup check misses and is released before `extract` returns, whether
/// it succeeds or fails.
pub struct BrowserSessionCrawler<C> {
    inner: C,
    options: ChromeOptions,
    launcher: Arc<dyn BrowserLauncher>,
    scroll: ScrollSettings,
}

impl<C: BrowserCrawler> BrowserSessionCrawler<C> {
    pub fn new(
        inner: C,
        launcher: Arc<dyn BrowserLauncher>,
        remote_debugging_port: u16,
        scroll: ScrollSettings,
    ) -> Result<Self, ExtractionError> {
        let mut options = ChromeOptions::new(remote_debugging_port)?;
        inner.set_extra_driver_options(&mut options);
        Ok(Self {
            inner,
            options,
            launcher,
            scroll,
        })
    }

    /// Wrap `inner` using the launcher and crawler settings in `services`.
    pub fn from_services(inner: C, services: &CrawlerServices) -> Result<Self, ExtractionError> {
        let crawler = &services.config.crawler;
        Self::new(
            inner,
            Arc::clone(&services.browser),
            crawler.remote_debugging_port,
            ScrollSettings::from(crawler),
        )
    }

    pub fn options(&self) -> &ChromeOptions {
        &self.options
    }
}

#[async_trait]
impl<C: BrowserCrawler> Crawler for BrowserSessionCrawler<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn extract(&self, link: &str, ctx: &CrawlContext) -> Result<(), ExtractionError> {
        if self.inner.already_crawled(link).await? {
            return Ok(());
        }

        info!(link, crawler = self.inner.name(), "Opening browser session");
        let mut session =
            BrowserSession::open(self.launcher.as_ref(), &self.options, self.scroll).await?;

        let result = async {
            self.inner.login(&mut session).await?;
            self.inner.crawl(&mut session, link, ctx).await
        }
        .await;

        if let Err(e) = session.close().await {
            warn!(link, error = %e, "Failed to close browser session cleanly");
        }
        result
    }
}
