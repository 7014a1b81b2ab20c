//! Stored-document lookup by link.
//!
//! Backs the `crawl find` command: prints every document a collection holds
//! for one exact link, with the logical `id` restored.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crawl_harness_core::store::{filter, DocumentStore};
use crawl_harness_core::{
    ArticleDocument, Document, PostDocument, Repository, RepositoryDocument,
};

use crate::config::Config;
use crate::sqlite_store::SqliteDocumentStore;

/// Collections that can be searched by link.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum LinkCollection {
    Articles,
    Posts,
    Repositories,
}

async fn find_as<T: Document>(store: Arc<dyn DocumentStore>, link: &str) -> Result<Vec<Value>> {
    let docs = Repository::<T>::new(store)
        .bulk_find(&filter([("link", link.into())]))
        .await?;
    docs.iter()
        .map(|d| Ok(serde_json::to_value(d)?))
        .collect()
}

/// Documents in `collection` whose link equals `link`.
pub async fn find_by_link(
    store: Arc<dyn DocumentStore>,
    collection: LinkCollection,
    link: &str,
) -> Result<Vec<Value>> {
    match collection {
        LinkCollection::Articles => find_as::<ArticleDocument>(store, link).await,
        LinkCollection::Posts => find_as::<PostDocument>(store, link).await,
        LinkCollection::Repositories => find_as::<RepositoryDocument>(store, link).await,
    }
}

#[derive(Debug, Serialize)]
struct FindResponse<'a> {
    link: &'a str,
    count: usize,
    documents: Vec<Value>,
}

pub async fn run_find(config: &Config, collection: LinkCollection, link: &str) -> Result<()> {
    let store = SqliteDocumentStore::open(config).await?;
    let pool = store.pool().clone();
    let documents = find_by_link(Arc::new(store), collection, link).await?;
    pool.close().await;

    let response = FindResponse {
        link,
        count: documents.len(),
        documents,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_harness_core::store::memory::InMemoryStore;
    use crawl_harness_core::{Content, UserDocument};

    #[tokio::test]
    async fn finds_documents_in_requested_collection() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let user = UserDocument::new("Ada", "Lovelace");
        let link = "https://www.linkedin.com/in/ada/";
        Repository::<PostDocument>::new(store.clone())
            .bulk_insert(vec![
                PostDocument::new(Content::new(), None, link, "www.linkedin.com", &user),
                PostDocument::new(Content::new(), None, link, "www.linkedin.com", &user),
            ])
            .await
            .unwrap();

        let posts = find_by_link(store.clone(), LinkCollection::Posts, link)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].get("id").is_some());
        assert!(posts[0].get("_id").is_none());

        let articles = find_by_link(store, LinkCollection::Articles, link)
            .await
            .unwrap();
        assert!(articles.is_empty());
    }
}
