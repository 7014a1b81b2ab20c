//! Document-store boundary for Crawl Harness.
//!
//! The [`DocumentStore`] trait is the only contract the repository layer
//! depends on: a collection-oriented, schemaless client supporting ordered
//! inserts and equality lookups. Records are JSON objects keyed by
//! [`PRIMARY_KEY`], which is distinct from the logical `id` field exposed
//! on entities.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`insert_one`](DocumentStore::insert_one) | Insert a single record |
//! | [`insert_many`](DocumentStore::insert_many) | Ordered, best-effort multi-insert |
//! | [`find_one`](DocumentStore::find_one) | First record matching a filter |
//! | [`find`](DocumentStore::find) | All records matching a filter |

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Primary-key field used inside the store.
pub const PRIMARY_KEY: &str = "_id";

/// Equality filter: every `(field, value)` pair must match exactly.
///
/// An empty filter matches every record in the collection.
pub type Filter = serde_json::Map<String, Value>;

/// Build a [`Filter`] from `(field, value)` pairs.
///
/// ```rust
/// use crawl_harness_core::store::filter;
///
/// let f = filter([("link", "https://example.com/a".into())]);
/// assert_eq!(f["link"], "https://example.com/a");
/// ```
pub fn filter<const N: usize>(pairs: [(&str, Value); N]) -> Filter {
    pairs
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}

/// Returns true when `record` satisfies every pair in `filter`.
///
/// Comparison is exact: no case folding, trimming, or URL normalization.
/// Values must agree in JSON type, so a `null` filter value only matches a
/// field that is present and null.
pub fn matches(record: &Value, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

/// Abstract schemaless document store.
///
/// All operations are async (via `async-trait`). Callers issue them one at
/// a time; no caching or pooling is assumed at this layer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one record. Fails with [`StoreError::Write`] when the record is
    /// not an object, lacks a string [`PRIMARY_KEY`], or reuses an existing one.
    async fn insert_one(&self, collection: &str, record: Value) -> Result<(), StoreError>;

    /// Insert records in order, stopping at the first rejection.
    ///
    /// Records before the failing one stay inserted; the error is
    /// [`StoreError::BulkWrite`] carrying how many made it in.
    async fn insert_many(&self, collection: &str, records: Vec<Value>) -> Result<(), StoreError>;

    /// Return the first record (in insertion order) matching `filter`.
    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Value>, StoreError>;

    /// Return all records matching `filter`, in insertion order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;
}

/// Extract the primary key of a record about to be written.
pub(crate) fn primary_key<'a>(collection: &str, record: &'a Value) -> Result<&'a str, StoreError> {
    let object = record.as_object().ok_or_else(|| StoreError::Write {
        collection: collection.to_string(),
        reason: "record is not a JSON object".to_string(),
    })?;
    object
        .get(PRIMARY_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Write {
            collection: collection.to_string(),
            reason: format!("record has no string '{}' field", PRIMARY_KEY),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_requires_every_pair() {
        let record = json!({"first_name": "Ada", "last_name": "Lovelace"});
        assert!(matches(&record, &filter([("first_name", "Ada".into())])));
        assert!(!matches(
            &record,
            &filter([("first_name", "Ada".into()), ("last_name", "Byron".into())])
        ));
        assert!(matches(&record, &Filter::new()));
    }

    #[test]
    fn matches_is_exact() {
        let record = json!({"link": "https://medium.com/@x/article"});
        assert!(!matches(&record, &filter([("link", "https://medium.com/@x/article/".into())])));
        assert!(!matches(&record, &filter([("link", "https://Medium.com/@x/article".into())])));
    }

    #[test]
    fn primary_key_requires_string() {
        assert_eq!(primary_key("c", &json!({"_id": "abc"})).unwrap(), "abc");
        assert!(primary_key("c", &json!({"_id": 7})).is_err());
        assert!(primary_key("c", &json!([1, 2])).is_err());
    }
}
