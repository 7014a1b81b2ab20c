//! Generic repository over [`Document`] entities.
//!
//! A [`Repository<T>`] is a stateless mapper: it serializes entities into
//! store records, renaming the logical `id` field to the store's
//! [`PRIMARY_KEY`], and maps records back on the way out. It owns no
//! entity instances and performs no duplicate checks of its own; callers
//! dedup through [`find`](Repository::find) before saving.
//!
//! # Failure policy
//!
//! - A missing collection binding is a [`ConfigurationError`] and always
//!   aborts the operation.
//! - Store failures are logged here and handed back as
//!   [`RepositoryError::Store`]. An empty result is `Ok(None)` / an empty
//!   `Vec`, never an error, so the two stay distinguishable.
//! - Nothing is retried and bulk inserts are not rolled back.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::{ConfigurationError, RepositoryError, StoreError};
use crate::models::Document;
use crate::store::{filter, DocumentStore, Filter, PRIMARY_KEY};

/// Logical identifier field on entities.
const LOGICAL_ID: &str = "id";

/// Serialize an entity into a store record.
///
/// Moves `id` to [`PRIMARY_KEY`] unless the record already carries one.
/// Identifiers serialize in their string form.
pub fn to_store<T: Serialize>(collection: &str, doc: &T) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(doc).map_err(|e| StoreError::Write {
        collection: collection.to_string(),
        reason: e.to_string(),
    })?;
    if let Value::Object(map) = &mut value {
        if !map.contains_key(PRIMARY_KEY) {
            if let Some(id) = map.remove(LOGICAL_ID) {
                map.insert(PRIMARY_KEY.to_string(), id);
            }
        }
    }
    Ok(value)
}

/// Map a store record back into an entity, restoring the logical `id`.
pub fn from_store<T: DeserializeOwned>(collection: &str, record: Value) -> Result<T, StoreError> {
    let malformed = |reason: String| StoreError::Malformed {
        collection: collection.to_string(),
        reason,
    };
    let Value::Object(mut map) = record else {
        return Err(malformed("record is not a JSON object".to_string()));
    };
    let id = map
        .remove(PRIMARY_KEY)
        .ok_or_else(|| malformed(format!("record has no '{}' field", PRIMARY_KEY)))?;
    map.insert(LOGICAL_ID.to_string(), id);
    serde_json::from_value(Value::Object(map)).map_err(|e| malformed(e.to_string()))
}

/// Save / find / bulk operations for one document type.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// The collection `T` is bound to.
    pub fn collection_name(&self) -> Result<&'static str, ConfigurationError> {
        T::collection_name()
    }

    /// Insert `doc` and return it on success.
    pub async fn save(&self, doc: T) -> Result<T, RepositoryError> {
        let collection = self.collection_name()?;
        let result = match to_store(collection, &doc) {
            Ok(record) => self.store.insert_one(collection, record).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(doc),
            Err(e) => {
                error!(collection, id = %doc.id(), error = %e, "Error saving document");
                Err(e.into())
            }
        }
    }

    /// Find one entity matching `filter`. `Ok(None)` when nothing matches.
    pub async fn find(&self, filter: &Filter) -> Result<Option<T>, RepositoryError> {
        let collection = self.collection_name()?;
        let found = self
            .store
            .find_one(collection, filter)
            .await
            .and_then(|record| record.map(|r| from_store(collection, r)).transpose());
        found.map_err(|e| {
            error!(collection, ?filter, error = %e, "Failed to find document");
            e.into()
        })
    }

    /// Find the entity whose `link` equals `link` exactly.
    pub async fn find_by_link(&self, link: &str) -> Result<Option<T>, RepositoryError> {
        self.find(&filter([("link", link.into())])).await
    }

    /// Find all entities matching `filter`. Records that no longer map onto
    /// `T` are skipped with a warning.
    pub async fn bulk_find(&self, filter: &Filter) -> Result<Vec<T>, RepositoryError> {
        let collection = self.collection_name()?;
        let records = self.store.find(collection, filter).await.map_err(|e| {
            error!(collection, ?filter, error = %e, "Failed to bulk find documents");
            RepositoryError::from(e)
        })?;
        Ok(records
            .into_iter()
            .filter_map(|record| match from_store(collection, record) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(collection, error = %e, "Skipping malformed document");
                    None
                }
            })
            .collect())
    }

    /// Insert all of `docs` in order.
    ///
    /// Best-effort: if the store rejects a document, those before it remain
    /// inserted and the error reports how many were written.
    pub async fn bulk_insert(&self, docs: Vec<T>) -> Result<(), RepositoryError> {
        let collection = self.collection_name()?;
        let attempted = docs.len();
        let mut records = Vec::with_capacity(attempted);
        for doc in &docs {
            match to_store(collection, doc) {
                Ok(record) => records.push(record),
                Err(e) => {
                    error!(collection, error = %e, "Failed to insert documents");
                    return Err(StoreError::BulkWrite {
                        collection: collection.to_string(),
                        inserted: 0,
                        attempted,
                        reason: e.to_string(),
                    }
                    .into());
                }
            }
        }
        self.store
            .insert_many(collection, records)
            .await
            .map_err(|e| {
                error!(collection, error = %e, "Failed to insert documents");
                e.into()
            })
    }

    /// Return the entity matching `filter`, creating it from the filter's
    /// values when none exists.
    ///
    /// Not atomic: two concurrent callers with the same filter can both miss
    /// and both insert. Sequential calls return the same entity.
    pub async fn get_or_create(&self, filter: Filter) -> Result<T, RepositoryError> {
        if let Some(existing) = self.find(&filter).await? {
            return Ok(existing);
        }
        let collection = self.collection_name()?;
        let created: T = serde_json::from_value(Value::Object(filter)).map_err(|e| {
            let e = StoreError::Write {
                collection: collection.to_string(),
                reason: format!("cannot build document from filter: {}", e),
            };
            error!(collection, error = %e, "Failed to create document");
            RepositoryError::from(e)
        })?;
        self.save(created).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleDocument, Content, UserDocument};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use serde::Deserialize;
    use uuid::Uuid;

    fn user() -> UserDocument {
        UserDocument::new("Ada", "Lovelace")
    }

    fn article(link: &str) -> ArticleDocument {
        let mut content = Content::new();
        content.insert("Title".into(), "Notes".into());
        ArticleDocument::new(content, link, "medium.com", &user())
    }

    /// Store whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn insert_one(&self, collection: &str, _: Value) -> Result<(), StoreError> {
            Err(StoreError::Write {
                collection: collection.into(),
                reason: "down".into(),
            })
        }
        async fn insert_many(&self, collection: &str, r: Vec<Value>) -> Result<(), StoreError> {
            Err(StoreError::BulkWrite {
                collection: collection.into(),
                inserted: 0,
                attempted: r.len(),
                reason: "down".into(),
            })
        }
        async fn find_one(&self, collection: &str, _: &Filter) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Query {
                collection: collection.into(),
                reason: "down".into(),
            })
        }
        async fn find(&self, collection: &str, _: &Filter) -> Result<Vec<Value>, StoreError> {
            Err(StoreError::Query {
                collection: collection.into(),
                reason: "down".into(),
            })
        }
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Unbound {
        id: Uuid,
    }

    impl Document for Unbound {
        fn id(&self) -> Uuid {
            self.id
        }
    }

    #[test]
    fn to_store_translates_id() {
        let doc = article("https://medium.com/@x/a");
        let record = to_store("articles", &doc).unwrap();
        assert_eq!(record["_id"], doc.id.to_string());
        assert!(record.get("id").is_none());
        assert_eq!(record["author_id"], doc.author_id.to_string());

        let back: ArticleDocument = from_store("articles", record).unwrap();
        assert_eq!(back.id, doc.id);
        assert_eq!(back.link, doc.link);
    }

    #[test]
    fn from_store_without_key_is_malformed() {
        let err = from_store::<UserDocument>("users", serde_json::json!({"first_name": "A"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn save_then_find_by_link() {
        let repo = Repository::<ArticleDocument>::new(Arc::new(InMemoryStore::new()));
        let saved = repo.save(article("https://medium.com/@x/a")).await.unwrap();
        let found = repo.find_by_link("https://medium.com/@x/a").await.unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert!(repo.find_by_link("https://medium.com/@x/a/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_failures_are_errors_not_misses() {
        let repo = Repository::<ArticleDocument>::new(Arc::new(BrokenStore));
        let err = repo.find_by_link("https://x").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Store(StoreError::Query { .. })));
        assert!(!err.is_fatal());
        assert!(repo.save(article("https://x")).await.is_err());
        assert!(repo.bulk_find(&Filter::new()).await.is_err());
    }

    #[tokio::test]
    async fn unbound_document_is_fatal() {
        let repo = Repository::<Unbound>::new(Arc::new(InMemoryStore::new()));
        let err = repo.save(Unbound { id: Uuid::new_v4() }).await.unwrap_err();
        assert!(err.is_fatal());
        let err = repo.find(&Filter::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Configuration(_)));
    }

    #[tokio::test]
    async fn get_or_create_is_stable_across_sequential_calls() {
        let store = Arc::new(InMemoryStore::new());
        let repo = Repository::<UserDocument>::new(store.clone());
        let f = filter([("first_name", "Ada".into()), ("last_name", "Lovelace".into())]);
        let first = repo.get_or_create(f.clone()).await.unwrap();
        let second = repo.get_or_create(f).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.count("users"), 1);
    }

    #[tokio::test]
    async fn bulk_insert_reports_partial_write() {
        let store = Arc::new(InMemoryStore::new());
        let repo = Repository::<ArticleDocument>::new(store.clone());
        let a = article("https://a");
        let mut dup = article("https://b");
        dup.id = a.id;
        let c = article("https://c");

        let err = repo.bulk_insert(vec![a, dup, c]).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Store(StoreError::BulkWrite { inserted: 1, .. })
        ));
        // Ordered, no rollback: the first document stays.
        assert_eq!(store.count("articles"), 1);
        assert_eq!(repo.bulk_find(&Filter::new()).await.unwrap().len(), 1);
    }
}
