//! User lookup for the ingestion pipeline.

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crawl_harness_core::store::filter;
use crawl_harness_core::{Repository, RepositoryError, UserDocument};

use crate::config::Config;
use crate::sqlite_store::SqliteDocumentStore;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user full name is empty")]
    EmptyName,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Split a full name into `(first_name, last_name)`.
///
/// A single token is used for both parts. Otherwise the last token is the
/// last name and everything before it, space-joined, is the first name.
pub fn split_user_full_name(full_name: &str) -> Result<(String, String), UserError> {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => Err(UserError::EmptyName),
        [only] => Ok((only.to_string(), only.to_string())),
        [rest @ .., last] => Ok((rest.join(" "), last.to_string())),
    }
}

/// What was asked for and what was found, as reported by `crawl user`.
#[derive(Debug, Clone, Serialize)]
pub struct UserLookup {
    pub query: UserQuery,
    pub retrieved: RetrievedUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserQuery {
    pub user_full_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedUser {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl UserLookup {
    fn new(full_name: &str, user: &UserDocument) -> Self {
        Self {
            query: UserQuery {
                user_full_name: full_name.to_string(),
            },
            retrieved: RetrievedUser {
                user_id: user.id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
            },
        }
    }
}

/// Find the user named `full_name`, creating it on a miss.
///
/// Inherits [`Repository::get_or_create`]'s race: concurrent callers with
/// the same name can create duplicates.
pub async fn get_or_create_user(
    users: &Repository<UserDocument>,
    full_name: &str,
) -> Result<(UserDocument, UserLookup), UserError> {
    info!(full_name, "Getting or creating user");
    let (first_name, last_name) = split_user_full_name(full_name)?;
    let user = users
        .get_or_create(filter([
            ("first_name", first_name.into()),
            ("last_name", last_name.into()),
        ]))
        .await?;
    info!(user_id = %user.id, "Resolved user");
    let lookup = UserLookup::new(full_name, &user);
    Ok((user, lookup))
}

/// `crawl user`: get-or-create and print the lookup report as JSON.
pub async fn run_user(config: &Config, full_name: &str) -> anyhow::Result<()> {
    let store = SqliteDocumentStore::open(config).await?;
    let pool = store.pool().clone();
    let users = Repository::<UserDocument>::new(std::sync::Arc::new(store));
    let result = get_or_create_user(&users, full_name).await;
    pool.close().await;

    let (_, lookup) = result?;
    println!("{}", serde_json::to_string_pretty(&lookup)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crawl_harness_core::store::memory::InMemoryStore;
    use std::sync::Arc;

    #[test]
    fn splits_names() {
        let split = |s: &str| split_user_full_name(s).unwrap();
        assert_eq!(split("Paul Iusztin"), ("Paul".into(), "Iusztin".into()));
        assert_eq!(
            split("Maxime  Labonne de Tal"),
            ("Maxime Labonne de".into(), "Tal".into())
        );
        assert_eq!(split("Cher"), ("Cher".into(), "Cher".into()));
        assert!(matches!(split_user_full_name("   "), Err(UserError::EmptyName)));
    }

    #[tokio::test]
    async fn lookup_reports_retrieved_user() {
        let store = Arc::new(InMemoryStore::new());
        let users = Repository::<UserDocument>::new(store.clone());

        let (first, lookup) = get_or_create_user(&users, "Ada Lovelace").await.unwrap();
        let (second, _) = get_or_create_user(&users, "Ada Lovelace").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.count("users"), 1);

        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["query"]["user_full_name"], "Ada Lovelace");
        assert_eq!(json["retrieved"]["first_name"], "Ada");
        assert_eq!(json["retrieved"]["last_name"], "Lovelace");
        assert_eq!(json["retrieved"]["user_id"], first.id.to_string());
    }
}
