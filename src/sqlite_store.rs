//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Every collection lives in the single `documents` table created by
//! [`migrate`](crate::migrate). Bodies are stored as JSON text and filters
//! are evaluated with `json_extract`, so no per-collection schema exists.
//!
//! A filter pair matches only when the field is present and has the same
//! JSON type as the filter value: `null` never matches a missing field and
//! `true` never matches `1`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

use crawl_harness_core::store::{DocumentStore, Filter, PRIMARY_KEY};
use crawl_harness_core::StoreError;

use crate::config::Config;
use crate::db;

/// SQLite implementation of the [`DocumentStore`] trait.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database named in `config`. Run `crawl init` first.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(db::connect(config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of records stored in `collection`.
    pub async fn count(&self, collection: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_error(collection, e))
    }

    async fn insert(&self, collection: &str, record: &Value) -> Result<(), StoreError> {
        let key = record
            .as_object()
            .and_then(|o| o.get(PRIMARY_KEY))
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Write {
                collection: collection.to_string(),
                reason: format!("record has no string '{}' field", PRIMARY_KEY),
            })?;

        sqlx::query(
            "INSERT INTO documents (collection, id, body, inserted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(key)
        .bind(record.to_string())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Write {
            collection: collection.to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    async fn select(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<i64>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut sql = String::from("SELECT body FROM documents WHERE collection = ?");
        for _ in filter {
            sql.push_str(
                " AND json_type(body, ?) IS json_type(?, '$') \
                 AND json_extract(body, ?) IS json_extract(?, '$')",
            );
        }
        sql.push_str(" ORDER BY seq");
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query_scalar::<_, String>(&sql).bind(collection);
        for (field, value) in filter {
            let path = json_path(field);
            let value = value.to_string();
            query = query
                .bind(path.clone())
                .bind(value.clone())
                .bind(path)
                .bind(value);
        }
        if let Some(n) = limit {
            query = query.bind(n);
        }

        let bodies = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error(collection, e))?;

        bodies
            .iter()
            .map(|body| {
                serde_json::from_str(body).map_err(|e| StoreError::Malformed {
                    collection: collection.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

/// JSON path addressing a top-level field, quoted so any key is valid.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

fn query_error(collection: &str, e: sqlx::Error) -> StoreError {
    StoreError::Query {
        collection: collection.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert_one(&self, collection: &str, record: Value) -> Result<(), StoreError> {
        self.insert(collection, &record).await
    }

    async fn insert_many(&self, collection: &str, records: Vec<Value>) -> Result<(), StoreError> {
        // Ordered and unwrapped: earlier rows stay written when a later one fails.
        let attempted = records.len();
        for (inserted, record) in records.iter().enumerate() {
            if let Err(e) = self.insert(collection, record).await {
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
        Ok(self
            .select(collection, filter, Some(1))
            .await?
            .into_iter()
            .next())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.select(collection, filter, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_harness_core::store::filter;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteDocumentStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::create_schema(&pool).await.unwrap();
        SqliteDocumentStore::new(pool)
    }

    #[test]
    fn json_path_quotes_field() {
        assert_eq!(json_path("link"), "$.\"link\"");
        assert_eq!(json_path("a\"b"), "$.\"ab\"");
    }

    #[tokio::test]
    async fn find_matches_exact_values() {
        let store = store().await;
        store
            .insert_one("articles", json!({"_id": "1", "link": "https://a/x", "n": 3}))
            .await
            .unwrap();
        store
            .insert_one("articles", json!({"_id": "2", "link": "https://a/x/", "n": 3}))
            .await
            .unwrap();

        let hit = store
            .find_one("articles", &filter([("link", "https://a/x".into())]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit["_id"], "1");

        let by_number = store
            .find("articles", &filter([("n", 3.into())]))
            .await
            .unwrap();
        assert_eq!(by_number.len(), 2);

        assert!(store
            .find_one("posts", &filter([("link", "https://a/x".into())]))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn filter_types_match_in_memory_semantics() {
        let store = store().await;
        store
            .insert_one("posts", json!({"_id": "1", "flag": 1}))
            .await
            .unwrap();
        store
            .insert_one("posts", json!({"_id": "2", "flag": true, "image": null}))
            .await
            .unwrap();

        let nulls = store
            .find("posts", &filter([("image", Value::Null)]))
            .await
            .unwrap();
        assert_eq!(nulls.len(), 1);
        assert_eq!(nulls[0]["_id"], "2");

        let trues = store
            .find("posts", &filter([("flag", Value::Bool(true))]))
            .await
            .unwrap();
        assert_eq!(trues.len(), 1);
        assert_eq!(trues[0]["_id"], "2");

        let ones = store
            .find("posts", &filter([("flag", 1.into())]))
            .await
            .unwrap();
        assert_eq!(ones.len(), 1);
        assert_eq!(ones[0]["_id"], "1");
    }

    #[tokio::test]
    async fn duplicate_key_is_write_error() {
        let store = store().await;
        store.insert_one("users", json!({"_id": "u"})).await.unwrap();
        let err = store.insert_one("users", json!({"_id": "u"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        // Same key in another collection is fine.
        store.insert_one("posts", json!({"_id": "u"})).await.unwrap();
    }

    #[tokio::test]
    async fn insert_many_keeps_rows_before_failure() {
        let store = store().await;
        let err = store
            .insert_many(
                "posts",
                vec![json!({"_id": "a"}), json!({"_id": "a"}), json!({"_id": "b"})],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::BulkWrite { inserted: 1, attempted: 3, .. }));
        assert_eq!(store.count("posts").await.unwrap(), 1);
    }
}
