//! In-memory [`DocumentStore`] implementation for testing.
//!
//! Uses a `HashMap` of per-collection `Vec`s behind `std::sync::RwLock`.
//! Enforces primary-key uniqueness and ordered, non-transactional bulk
//! inserts the way a real document database does.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

use super::{matches, primary_key, DocumentStore, Filter};

/// In-memory store for tests and dry runs.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn insert_locked(
        records: &mut Vec<Value>,
        collection: &str,
        record: Value,
    ) -> Result<(), StoreError> {
        let key = primary_key(collection, &record)?;
        let duplicate = records
            .iter()
            .any(|r| r.get(super::PRIMARY_KEY).and_then(Value::as_str) == Some(key));
        if duplicate {
            return Err(StoreError::Write {
                collection: collection.to_string(),
                reason: format!("duplicate key '{}'", key),
            });
        }
        records.push(record);
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_one(&self, collection: &str, record: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        let records = collections.entry(collection.to_string()).or_default();
        Self::insert_locked(records, collection, record)
    }

    async fn insert_many(&self, collection: &str, records: Vec<Value>) -> Result<(), StoreError> {
        let attempted = records.len();
        let mut collections = self.collections.write().unwrap();
        let stored = collections.entry(collection.to_string()).or_default();
        for (inserted, record) in records.into_iter().enumerate() {
            if let Err(e) = Self::insert_locked(stored, collection, record) {
                return Err(StoreError::BulkWrite {
                    collection: collection.to_string(),
                    inserted,
                    attempted,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| matches(r, filter)).cloned()))
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches(r, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::filter;
    use serde_json::json;

    #[tokio::test]
    async fn duplicate_key_rejected() {
        let store = InMemoryStore::new();
        store.insert_one("c", json!({"_id": "a"})).await.unwrap();
        let err = store.insert_one("c", json!({"_id": "a"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(store.count("c"), 1);
    }

    #[tokio::test]
    async fn insert_many_is_ordered_best_effort() {
        let store = InMemoryStore::new();
        let err = store
            .insert_many(
                "c",
                vec![json!({"_id": "a"}), json!({"no_key": true}), json!({"_id": "c"})],
            )
            .await
            .unwrap_err();
        match err {
            StoreError::BulkWrite {
                inserted, attempted, ..
            } => {
                assert_eq!(inserted, 1);
                assert_eq!(attempted, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The first record stays; nothing after the failure was written.
        assert_eq!(store.count("c"), 1);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = InMemoryStore::new();
        store.insert_one("a", json!({"_id": "1", "k": "v"})).await.unwrap();
        let f = filter([("k", "v".into())]);
        assert!(store.find_one("b", &f).await.unwrap().is_none());
        assert_eq!(store.find("a", &f).await.unwrap().len(), 1);
    }
}
