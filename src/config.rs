use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub linkedin: LinkedInConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    /// Maximum scrolls per page. `0` stops after the first scroll.
    #[serde(default = "default_scroll_limit")]
    pub scroll_limit: Option<u32>,
    #[serde(default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,
    #[serde(default = "default_remote_debugging_port")]
    pub remote_debugging_port: u16,
    #[serde(default = "default_webdriver_binary")]
    pub webdriver_binary: PathBuf,
    #[serde(default = "default_webdriver_port")]
    pub webdriver_port: u16,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            scroll_limit: default_scroll_limit(),
            scroll_pause_ms: default_scroll_pause_ms(),
            remote_debugging_port: default_remote_debugging_port(),
            webdriver_binary: default_webdriver_binary(),
            webdriver_port: default_webdriver_port(),
            http_timeout_secs: default_http_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl CrawlerConfig {
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_scroll_limit() -> Option<u32> {
    Some(5)
}
fn default_scroll_pause_ms() -> u64 {
    5000
}
fn default_remote_debugging_port() -> u16 {
    9226
}
fn default_webdriver_binary() -> PathBuf {
    PathBuf::from("chromedriver")
}
fn default_webdriver_port() -> u16 {
    9515
}
fn default_http_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("crawl-harness/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LinkedInConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LinkedInConfig {
    /// Credentials from the config file, falling back to
    /// `LINKEDIN_USERNAME` / `LINKEDIN_PASSWORD`.
    pub fn credentials(&self) -> Option<(String, String)> {
        let username = self
            .username
            .clone()
            .or_else(|| std::env::var("LINKEDIN_USERNAME").ok())?;
        let password = self
            .password
            .clone()
            .or_else(|| std::env::var("LINKEDIN_PASSWORD").ok())?;
        Some((username, password))
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.crawler.http_timeout_secs == 0 {
        anyhow::bail!("crawler.http_timeout_secs must be > 0");
    }

    if config.crawler.remote_debugging_port == config.crawler.webdriver_port {
        anyhow::bail!(
            "crawler.remote_debugging_port and crawler.webdriver_port must differ (both {})",
            config.crawler.webdriver_port
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        let config = parse_config("[db]\npath = \"data/crawl.sqlite\"\n").unwrap();
        assert_eq!(config.crawler.scroll_limit, Some(5));
        assert_eq!(config.crawler.scroll_pause(), Duration::from_secs(5));
        assert_eq!(config.crawler.remote_debugging_port, 9226);
        assert!(config.linkedin.username.is_none());
    }

    #[test]
    fn zero_scroll_limit_kept() {
        let config =
            parse_config("[db]\npath = \"x\"\n[crawler]\nscroll_limit = 0\nscroll_pause_ms = 10\n")
                .unwrap();
        assert_eq!(config.crawler.scroll_limit, Some(0));
        assert_eq!(config.crawler.scroll_pause(), Duration::from_millis(10));
    }

    #[test]
    fn port_clash_rejected() {
        let err = parse_config(
            "[db]\npath = \"x\"\n[crawler]\nremote_debugging_port = 9515\nwebdriver_port = 9515\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(parse_config("[db]\npath = \"x\"\n[crawler]\nhttp_timeout_secs = 0\n").is_err());
    }
}
