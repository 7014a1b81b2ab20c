//! Document entities persisted by Crawl Harness.
//!
//! Entities are plain data. Persistence mechanics live in
//! [`Repository`](crate::repository::Repository), which is generic over the
//! [`Document`] trait defined here. Each entity binds itself to a store
//! collection through [`Document::COLLECTION`].
//!
//! | Entity | Collection | Dedup key |
//! |--------|------------|-----------|
//! | [`ArticleDocument`] | `articles` | `link` |
//! | [`PostDocument`] | `posts` | `link` |
//! | [`RepositoryDocument`] | `repositories` | `link` |
//! | [`UserDocument`] | `users` | `(first_name, last_name)` |

use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigurationError;

/// Semantic content fields of a document (title, body, language, ...).
pub type Content = serde_json::Map<String, serde_json::Value>;

/// A typed record stored in a named collection.
///
/// The logical identifier is exposed as `id`; the repository translates it
/// to the store's primary-key field on the way in and back on the way out.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection this entity is stored in. Leaving it unset is a
    /// configuration error surfaced by [`Document::collection_name`].
    const COLLECTION: Option<&'static str> = None;

    fn id(&self) -> Uuid;

    fn collection_name() -> Result<&'static str, ConfigurationError> {
        Self::COLLECTION.ok_or(ConfigurationError::MissingCollection {
            document: std::any::type_name::<Self>(),
        })
    }
}

/// Known data categories. Variants double as collection names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    Prompt,
    Queries,
    InstructDatasetSamples,
    InstructDataset,
    PreferenceDatasetSamples,
    PreferenceDataset,
    Posts,
    Articles,
    Repositories,
}

impl DataCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataCategory::Prompt => "prompt",
            DataCategory::Queries => "queries",
            DataCategory::InstructDatasetSamples => "instruct_dataset_samples",
            DataCategory::InstructDataset => "instruct_dataset",
            DataCategory::PreferenceDatasetSamples => "preference_dataset_samples",
            DataCategory::PreferenceDataset => "preference_dataset",
            DataCategory::Posts => "posts",
            DataCategory::Articles => "articles",
            DataCategory::Repositories => "repositories",
        }
    }
}

impl std::fmt::Display for DataCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entities compare and hash by `id` only.
macro_rules! identity_by_id {
    ($($ty:ty),+ $(,)?) => {$(
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
    )+};
}

/// A person on whose behalf content is ingested.
///
/// Documents reference a user through `author_id` / `author_full_name`;
/// the user does not own or cascade to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl UserDocument {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Document for UserDocument {
    const COLLECTION: Option<&'static str> = Some("users");

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A long-form article from a blog or publishing platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub content: Content,
    pub link: String,
    pub platform: String,
    pub author_id: Uuid,
    pub author_full_name: String,
}

impl ArticleDocument {
    pub fn new(content: Content, link: &str, platform: &str, author: &UserDocument) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            link: link.to_string(),
            platform: platform.to_string(),
            author_id: author.id,
            author_full_name: author.full_name(),
        }
    }
}

impl Document for ArticleDocument {
    const COLLECTION: Option<&'static str> = Some(DataCategory::Articles.as_str());

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A short post from a professional network feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub content: Content,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub platform: String,
    pub author_id: Uuid,
    pub author_full_name: String,
}

impl PostDocument {
    pub fn new(
        content: Content,
        image: Option<String>,
        link: &str,
        platform: &str,
        author: &UserDocument,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            image,
            link: Some(link.to_string()),
            platform: platform.to_string(),
            author_id: author.id,
            author_full_name: author.full_name(),
        }
    }
}

impl Document for PostDocument {
    const COLLECTION: Option<&'static str> = Some(DataCategory::Posts.as_str());

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A snapshot of a code-hosting repository: relative path → file text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub content: Content,
    pub name: String,
    pub link: String,
    pub platform: String,
    pub author_id: Uuid,
    pub author_full_name: String,
}

impl RepositoryDocument {
    pub fn new(
        content: Content,
        name: &str,
        link: &str,
        platform: &str,
        author: &UserDocument,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            name: name.to_string(),
            link: link.to_string(),
            platform: platform.to_string(),
            author_id: author.id,
            author_full_name: author.full_name(),
        }
    }
}

impl Document for RepositoryDocument {
    const COLLECTION: Option<&'static str> = Some(DataCategory::Repositories.as_str());

    fn id(&self) -> Uuid {
        self.id
    }
}

identity_by_id!(UserDocument, ArticleDocument, PostDocument, RepositoryDocument);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Serialize, Deserialize)]
    struct Unbound {
        id: Uuid,
    }

    impl Document for Unbound {
        fn id(&self) -> Uuid {
            self.id
        }
    }

    #[test]
    fn collection_names_are_bound() {
        assert_eq!(ArticleDocument::collection_name().unwrap(), "articles");
        assert_eq!(PostDocument::collection_name().unwrap(), "posts");
        assert_eq!(RepositoryDocument::collection_name().unwrap(), "repositories");
        assert_eq!(UserDocument::collection_name().unwrap(), "users");
    }

    #[test]
    fn missing_collection_is_configuration_error() {
        let err = Unbound::collection_name().unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingCollection { .. }));
        assert!(err.to_string().contains("Unbound"));
    }

    #[test]
    fn user_id_generated_when_absent() {
        let user: UserDocument =
            serde_json::from_value(serde_json::json!({"first_name": "Ada", "last_name": "Lovelace"}))
                .unwrap();
        assert_eq!(user.full_name(), "Ada Lovelace");
        assert_ne!(user.id, Uuid::nil());
    }

    #[test]
    fn equality_is_by_id() {
        let a = UserDocument::new("Ada", "Lovelace");
        let mut b = a.clone();
        b.first_name = "Augusta".into();
        assert_eq!(a, b);
        assert_ne!(a, UserDocument::new("Ada", "Lovelace"));
    }

    #[test]
    fn data_category_serializes_snake_case() {
        let json = serde_json::to_string(&DataCategory::InstructDatasetSamples).unwrap();
        assert_eq!(json, "\"instruct_dataset_samples\"");
        assert_eq!(DataCategory::Repositories.to_string(), "repositories");
    }
}
