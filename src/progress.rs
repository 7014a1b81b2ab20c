//! Crawl progress reporting.
//!
//! Reports observable progress while `crawl links` works through a batch so
//! users see which link is being processed and how many remain. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a crawl batch.
#[derive(Clone, Debug)]
pub enum CrawlProgressEvent {
    /// About to extract link `n` of `total`.
    Crawling {
        link: String,
        crawler: String,
        n: u64,
        total: u64,
    },
    /// Link `n` finished, successfully or not.
    Finished {
        link: String,
        success: bool,
        n: u64,
        total: u64,
    },
}

/// Reports crawl progress. Implementations write to stderr (human or JSON).
pub trait CrawlProgressReporter: Send + Sync {
    fn report(&self, event: CrawlProgressEvent);
}

/// Human-friendly progress on stderr: "crawl  3 / 12  medium  https://...".
pub struct StderrProgress;

impl CrawlProgressReporter for StderrProgress {
    fn report(&self, event: CrawlProgressEvent) {
        let line = match &event {
            CrawlProgressEvent::Crawling {
                link,
                crawler,
                n,
                total,
            } => format!(
                "crawl  {} / {}  {}  {}\n",
                format_number(*n),
                format_number(*total),
                crawler,
                link
            ),
            CrawlProgressEvent::Finished {
                link,
                success,
                n,
                total,
            } => format!(
                "crawl  {} / {}  {}  {}\n",
                format_number(*n),
                format_number(*total),
                if *success { "done" } else { "failed" },
                link
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl CrawlProgressReporter for JsonProgress {
    fn report(&self, event: CrawlProgressEvent) {
        let obj = match &event {
            CrawlProgressEvent::Crawling {
                link,
                crawler,
                n,
                total,
            } => serde_json::json!({
                "event": "progress",
                "phase": "crawling",
                "link": link,
                "crawler": crawler,
                "n": n,
                "total": total
            }),
            CrawlProgressEvent::Finished {
                link,
                success,
                n,
                total,
            } => serde_json::json!({
                "event": "progress",
                "phase": "finished",
                "link": link,
                "success": success,
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl CrawlProgressReporter for NoProgress {
    fn report(&self, _event: CrawlProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn CrawlProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
