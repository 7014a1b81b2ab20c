//! Link → strategy resolution.
//!
//! A [`CrawlerDispatcher`] maps registered domains to strategy factories.
//! It is assembled once through [`DispatcherBuilder`] and is immutable
//! afterwards, so `resolve` takes `&self` and needs no locking.
//!
//! # Matching
//!
//! A link matches a registered domain when its host equals the domain or is
//! a subdomain of it (`www.medium.com` and `blog.medium.com` both match
//! `medium.com`). Domains are checked in registration order and the first
//! match wins. Links that match nothing, or that cannot be parsed, resolve
//! to the default strategy.
//!
//! ```text
//! link ──▶ host ──▶ medium.com? ──▶ linkedin.com? ──▶ github.com? ──▶ default
//!                       │               │                 │
//!                       ▼               ▼                 ▼
//!                 MediumCrawler   LinkedInCrawler    GithubCrawler
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::browser::BrowserSessionCrawler;
use crate::crawler::{Crawler, CrawlerServices, ExtractionError};
use crate::crawler_article::ArticleCrawler;
use crate::crawler_github::GithubCrawler;
use crate::crawler_linkedin::LinkedInCrawler;
use crate::crawler_medium::MediumCrawler;

/// Builds a fresh strategy instance per resolved link.
pub type CrawlerFactory =
    Arc<dyn Fn(&CrawlerServices) -> Result<Box<dyn Crawler>, ExtractionError> + Send + Sync>;

/// Normalize a registration key (`"https://www.medium.com"`, `"medium.com"`)
/// to a bare lowercase domain.
pub fn normalize_domain(pattern: &str) -> String {
    let host = url::Url::parse(pattern)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| {
            pattern
                .split(&['/', ':'][..])
                .next()
                .unwrap_or_default()
                .to_string()
        });
    let host = host.trim().to_ascii_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Collects registrations before the dispatcher is frozen.
pub struct DispatcherBuilder {
    services: CrawlerServices,
    entries: Vec<(String, CrawlerFactory)>,
    default: CrawlerFactory,
}

impl DispatcherBuilder {
    /// Bind `factory` to `domain`. Re-registering a domain keeps the first
    /// binding's position in the match order.
    pub fn register<F>(mut self, domain: &str, factory: F) -> Self
    where
        F: Fn(&CrawlerServices) -> Result<Box<dyn Crawler>, ExtractionError>
            + Send
            + Sync
            + 'static,
    {
        let domain = normalize_domain(domain);
        let factory: CrawlerFactory = Arc::new(factory);
        match self.entries.iter_mut().find(|(d, _)| *d == domain) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((domain, factory)),
        }
        self
    }

    pub fn register_medium(self) -> Self {
        self.register("https://medium.com", |services| {
            let crawler = BrowserSessionCrawler::from_services(MediumCrawler::new(services), services)?;
            Ok(Box::new(crawler) as Box<dyn Crawler>)
        })
    }

    pub fn register_linkedin(self) -> Self {
        self.register("https://linkedin.com", |services| {
            let crawler =
                BrowserSessionCrawler::from_services(LinkedInCrawler::new(services), services)?;
            Ok(Box::new(crawler) as Box<dyn Crawler>)
        })
    }

    pub fn register_github(self) -> Self {
        self.register("https://github.com", |services| {
            Ok(Box::new(GithubCrawler::new(services)) as Box<dyn Crawler>)
        })
    }

    /// Replace the fallback strategy (the article crawler by default).
    pub fn with_default<F>(mut self, factory: F) -> Self
    where
        F: Fn(&CrawlerServices) -> Result<Box<dyn Crawler>, ExtractionError>
            + Send
            + Sync
            + 'static,
    {
        self.default = Arc::new(factory);
        self
    }

    pub fn build(self) -> CrawlerDispatcher {
        CrawlerDispatcher {
            services: self.services,
            entries: self.entries,
            default: self.default,
        }
    }
}

/// Immutable domain → strategy registry.
pub struct CrawlerDispatcher {
    services: CrawlerServices,
    entries: Vec<(String, CrawlerFactory)>,
    default: CrawlerFactory,
}

impl CrawlerDispatcher {
    /// Start a registry with no domains and the article crawler as default.
    pub fn builder(services: CrawlerServices) -> DispatcherBuilder {
        DispatcherBuilder {
            services,
            entries: Vec::new(),
            default: Arc::new(|services: &CrawlerServices| {
                Ok(Box::new(ArticleCrawler::new(services)) as Box<dyn Crawler>)
            }),
        }
    }

    /// Registry with every built-in strategy.
    pub fn with_builtins(services: CrawlerServices) -> Self {
        Self::builder(services)
            .register_linkedin()
            .register_medium()
            .register_github()
            .build()
    }

    pub fn services(&self) -> &CrawlerServices {
        &self.services
    }

    /// Registered domains in match order.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(d, _)| d.as_str())
    }

    fn entry(&self, link: &str) -> Option<&(String, CrawlerFactory)> {
        let url = url::Url::parse(link).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();
        self.entries.iter().find(|(d, _)| host_matches(&host, d))
    }

    /// The registered domain `link` matches, if any.
    pub fn matched_domain(&self, link: &str) -> Option<&str> {
        self.entry(link).map(|(d, _)| d.as_str())
    }

    /// A new strategy instance for `link`.
    pub fn resolve(&self, link: &str) -> Result<Box<dyn Crawler>, ExtractionError> {
        if let Some((domain, factory)) = self.entry(link) {
            debug!(link, domain = domain.as_str(), "Resolved crawler");
            return factory(&self.services);
        }
        warn!(link, "No crawler found, defaulting to custom article crawler");
        (self.default)(&self.services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserDriver, BrowserLauncher, ChromeOptions};
    use crate::config::parse_config;
    use crate::crawler::CrawlContext;
    use crate::fetch::PageFetcher;
    use async_trait::async_trait;
    use crawl_harness_core::store::memory::InMemoryStore;

    struct NoFetch;

    #[async_trait]
    impl PageFetcher for NoFetch {
        async fn fetch(&self, link: &str) -> Result<String, ExtractionError> {
            Err(ExtractionError::Fetch {
                link: link.to_string(),
                reason: "offline".into(),
            })
        }
    }

    struct NoBrowser;

    #[async_trait]
    impl BrowserLauncher for NoBrowser {
        async fn launch(&self, _: &ChromeOptions) -> Result<Box<dyn BrowserDriver>, ExtractionError> {
            Err(ExtractionError::Browser("offline".into()))
        }
    }

    fn services() -> CrawlerServices {
        CrawlerServices {
            store: Arc::new(InMemoryStore::new()),
            config: Arc::new(parse_config("[db]\npath = \"x\"\n").unwrap()),
            fetcher: Arc::new(NoFetch),
            browser: Arc::new(NoBrowser),
        }
    }

    struct Named(&'static str);

    #[async_trait]
    impl Crawler for Named {
        fn name(&self) -> &str {
            self.0
        }
        async fn extract(&self, _: &str, _: &CrawlContext) -> Result<(), ExtractionError> {
            Ok(())
        }
    }

    fn named(
        name: &'static str,
    ) -> impl Fn(&CrawlerServices) -> Result<Box<dyn Crawler>, ExtractionError> + Send + Sync + 'static
    {
        move |_| Ok(Box::new(Named(name)) as Box<dyn Crawler>)
    }

    #[test]
    fn normalizes_registration_keys() {
        assert_eq!(normalize_domain("https://medium.com"), "medium.com");
        assert_eq!(normalize_domain("https://www.LinkedIn.com/"), "linkedin.com");
        assert_eq!(normalize_domain("github.com"), "github.com");
        assert_eq!(normalize_domain("www.example.org/path"), "example.org");
    }

    #[test]
    fn builtins_resolve_by_domain() {
        let dispatcher = CrawlerDispatcher::with_builtins(services());
        let name = |link: &str| dispatcher.resolve(link).unwrap().name().to_string();

        assert_eq!(name("https://medium.com/@x/article"), "medium");
        assert_eq!(name("https://www.linkedin.com/in/someone/"), "linkedin");
        assert_eq!(name("https://github.com/rust-lang/cargo"), "github");
        assert_eq!(name("https://blog.rust-lang.org/2024/01/01/post.html"), "article");
    }

    #[test]
    fn suffix_match_requires_label_boundary() {
        let dispatcher = CrawlerDispatcher::builder(services())
            .register("medium.com", named("medium"))
            .with_default(named("default"))
            .build();
        let name = |link: &str| dispatcher.resolve(link).unwrap().name().to_string();

        assert_eq!(name("https://someone.medium.com/post"), "medium");
        assert_eq!(name("https://notmedium.com/post"), "default");
        assert_eq!(name("https://medium.com.evil.io/post"), "default");
    }

    #[test]
    fn first_registration_wins() {
        let dispatcher = CrawlerDispatcher::builder(services())
            .register("example.com", named("broad"))
            .register("docs.example.com", named("narrow"))
            .build();
        assert_eq!(
            dispatcher.resolve("https://docs.example.com/a").unwrap().name(),
            "broad"
        );
        assert_eq!(dispatcher.domains().collect::<Vec<_>>(), ["example.com", "docs.example.com"]);
    }

    #[test]
    fn unparseable_link_falls_back_to_default() {
        let dispatcher = CrawlerDispatcher::with_builtins(services());
        assert!(dispatcher.matched_domain("not a url").is_none());
        assert_eq!(dispatcher.resolve("not a url").unwrap().name(), "article");
    }
}
