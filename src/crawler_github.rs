//! Code repositories, captured by shallow-cloning and walking the tree.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;

use crawl_harness_core::{Content, Repository, RepositoryDocument};

use crate::crawler::{
    already_exists, network_location, CrawlContext, Crawler, CrawlerServices, ExtractionError,
};

/// Path prefixes / suffixes never captured.
pub const IGNORED: &[&str] = &[".git", ".toml", ".lock", ".png"];

pub struct GithubCrawler {
    repositories: Repository<RepositoryDocument>,
    ignore: Vec<String>,
}

impl GithubCrawler {
    pub fn new(services: &CrawlerServices) -> Self {
        Self {
            repositories: services.repository(),
            ignore: IGNORED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Repository name: the last non-empty path segment of the link.
pub fn repository_name(link: &str) -> Result<String, ExtractionError> {
    let url = url::Url::parse(link).map_err(|e| ExtractionError::InvalidLink {
        link: link.to_string(),
        reason: e.to_string(),
    })?;
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.trim_end_matches(".git").to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ExtractionError::InvalidLink {
            link: link.to_string(),
            reason: "link has no repository path".to_string(),
        })
}

fn git_clone(link: &str, dest: &Path) -> Result<(), ExtractionError> {
    let output = Command::new("git")
        .args(["clone", "--depth", "1", "--quiet"])
        .arg(link)
        .arg(dest)
        .output()
        .map_err(|e| ExtractionError::Git(format!("failed to execute 'git clone': {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Git(format!(
            "git clone {} failed: {}",
            link,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Map each captured file's relative path to its text with spaces removed.
///
/// Binary files are read lossily.
pub fn snapshot_tree(root: &Path, ignore: &[String]) -> Result<Content, ExtractionError> {
    let mut content = Content::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ExtractionError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if ignore
            .iter()
            .any(|p| rel_str.starts_with(p.as_str()) || rel_str.ends_with(p.as_str()))
        {
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        let text = String::from_utf8_lossy(&bytes).replace(' ', "");
        content.insert(rel_str, Value::String(text));
    }
    Ok(content)
}

/// Shallow-clone `link` into a temporary directory and snapshot it.
///
/// Blocking. The clone is removed before returning, on success or failure.
pub fn clone_snapshot(link: &str, ignore: &[String]) -> Result<Content, ExtractionError> {
    let workdir = TempDir::new()?;
    let dest = workdir.path().join("repo");
    git_clone(link, &dest)?;
    snapshot_tree(&dest, ignore)
}

#[async_trait]
impl Crawler for GithubCrawler {
    fn name(&self) -> &str {
        "github"
    }

    async fn extract(&self, link: &str, ctx: &CrawlContext) -> Result<(), ExtractionError> {
        if already_exists(&self.repositories, link).await? {
            return Ok(());
        }

        info!(link, "Starting scraping GitHub repository");
        let name = repository_name(link)?;
        let platform = network_location(link)?;

        let owned_link = link.to_string();
        let ignore = self.ignore.clone();
        let content = tokio::task::spawn_blocking(move || clone_snapshot(&owned_link, &ignore))
            .await
        .map_err(|e| ExtractionError::Git(format!("clone task failed: {}", e)))??;
        debug!(link, files = content.len(), "Repository snapshot taken");

        self.repositories
            .save(RepositoryDocument::new(content, &name, link, &platform, &ctx.user))
            .await?;
        info!(link, "Finished scraping GitHub repository");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_last_segment() {
        assert_eq!(
            repository_name("https://github.com/rust-lang/cargo").unwrap(),
            "cargo"
        );
        assert_eq!(
            repository_name("https://github.com/rust-lang/cargo/").unwrap(),
            "cargo"
        );
        assert_eq!(
            repository_name("https://github.com/rust-lang/cargo.git").unwrap(),
            "cargo"
        );
        assert!(repository_name("https://github.com/").is_err());
    }

    #[test]
    fn snapshot_skips_ignored_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref: main").unwrap();
        std::fs::write(root.join("Cargo.toml"), "[package]").unwrap();
        std::fs::write(root.join("Cargo.lock"), "# lock").unwrap();
        std::fs::write(root.join("logo.png"), [0u8, 1, 2]).unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() { }").unwrap();
        std::fs::write(root.join(".gitignore"), "target").unwrap();

        let ignore: Vec<String> = IGNORED.iter().map(|s| s.to_string()).collect();
        let content = snapshot_tree(root, &ignore).unwrap();
        let keys: Vec<&str> = content.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["src/main.rs"]);
        assert_eq!(content["src/main.rs"], "fnmain(){}");
    }
}
