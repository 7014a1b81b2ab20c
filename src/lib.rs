//! # Crawl Harness
//!
//! Link ingestion for content pipelines: resolve each URL to an extraction
//! strategy, fetch and transform its content, and persist it exactly once
//! per link in a document store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐   ┌────────────┐
//! │ crawl links │──▶│  Dispatcher  │──▶│   Crawlers   │──▶│ Repository │
//! │  (ingest)   │   │ domain match │   │ HTTP/Browser │   │   <T>      │
//! └─────────────┘   └──────────────┘   │     /Git     │   └─────┬──────┘
//!                                      └──────────────┘         ▼
//!                                                        ┌──────────────┐
//!                                                        │DocumentStore │
//!                                                        │SQLite/Memory │
//!                                                        └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crawl init
//! crawl user "Ada Lovelace"
//! crawl links --user "Ada Lovelace" https://medium.com/@ada/notes
//! crawl find articles --link https://medium.com/@ada/notes
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`crawler`] | The [`crawler::Crawler`] capability and shared helpers |
//! | [`dispatcher`] | Domain → strategy registry |
//! | [`crawler_article`] | Default HTTP article strategy |
//! | [`crawler_medium`] | Medium strategy (browser) |
//! | [`crawler_linkedin`] | LinkedIn strategy (browser, login) |
//! | [`crawler_github`] | Git repository strategy |
//! | [`browser`] | Browser sessions and scroll-until-stable |
//! | [`webdriver`] | W3C WebDriver client |
//! | [`fetch`] | Plain HTTP page fetching |
//! | [`find`] | Stored-document lookup by link |
//! | [`extract`] | HTML text extraction |
//! | [`ingest`] | Sequential batch crawling |
//! | [`users`] | User get-or-create |
//! | [`sqlite_store`] | SQLite document store |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`progress`] | Progress reporting on stderr |

pub mod browser;
pub mod config;
pub mod crawler;
pub mod crawler_article;
pub mod crawler_github;
pub mod crawler_linkedin;
pub mod crawler_medium;
pub mod db;
pub mod dispatcher;
pub mod extract;
pub mod fetch;
pub mod find;
pub mod ingest;
pub mod migrate;
pub mod progress;
pub mod sqlite_store;
pub mod users;
pub mod webdriver;

pub use crawl_harness_core::{models, repository, store};
