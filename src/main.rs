//! # Crawl Harness CLI (`crawl`)
//!
//! ## Usage
//!
//! ```bash
//! crawl --config ./config/crawl.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `crawl init` | Create the SQLite database and run schema migrations |
//! | `crawl user "<full name>"` | Get or create a user and print the lookup |
//! | `crawl links --user "<full name>" [LINK...]` | Crawl links on behalf of a user |
//! | `crawl find <collection> --link <url>` | Print stored documents for a link |
//!
//! ## Examples
//!
//! ```bash
//! crawl init
//! crawl links --user "Ada Lovelace" --file reading-list.txt --progress json
//! crawl find posts --link https://www.linkedin.com/in/ada/
//! ```
//!
//! Logging goes to stderr and is controlled with `CRAWL_LOG`
//! (e.g. `CRAWL_LOG=crawl_harness=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crawl_harness::find::LinkCollection;
use crawl_harness::progress::ProgressMode;
use crawl_harness::{config, find, ingest, migrate, users};

/// Crawl Harness: resolve links to extraction strategies and persist each
/// link's content exactly once.
#[derive(Parser)]
#[command(name = "crawl", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/crawl.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Get or create a user by full name and print the lookup as JSON.
    User {
        /// Full name, e.g. "Ada Lovelace".
        full_name: String,
    },

    /// Crawl links on behalf of a user.
    ///
    /// Links are processed one at a time. A failing link is reported and the
    /// batch continues. Prints per-domain counters as JSON when done.
    Links {
        /// Full name of the user the content belongs to.
        #[arg(long)]
        user: String,

        /// Read links from a file, one per line.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Links to crawl (appended after those from `--file`).
        links: Vec<String>,
    },

    /// Print the documents stored for a link.
    Find {
        #[arg(value_enum)]
        collection: LinkCollection,

        /// Exact link (no normalization).
        #[arg(long)]
        link: String,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CRAWL_LOG").unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("crawl_harness=info,crawl_harness_core=info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::User { full_name } => {
            users::run_user(&cfg, &full_name).await?;
        }
        Commands::Links {
            user,
            file,
            progress,
            links,
        } => {
            let mut all = match file {
                Some(path) => ingest::read_links_file(&path)?,
                None => Vec::new(),
            };
            all.extend(links);
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            ingest::run_links(&cfg, &user, all, mode).await?;
        }
        Commands::Find { collection, link } => {
            find::run_find(&cfg, collection, &link).await?;
        }
    }

    Ok(())
}
