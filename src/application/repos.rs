//! Repository and storage traits describing persistence adapters.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{PostInfo, PostRecord, SessionRecord};
use crate::domain::types::PostType;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub id: String,
    pub post_type: PostType,
    pub title: String,
    pub description: String,
    pub content: String,
}

/// Replaces every mutable field of the post currently stored as `current_id`.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub current_id: String,
    pub id: String,
    pub post_type: PostType,
    pub unlisted: bool,
    pub title: String,
    pub description: String,
    pub content: String,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Newest first.
    async fn list_posts(&self, include_unlisted: bool) -> Result<Vec<PostInfo>, RepoError>;

    /// Ranked by relevance; rows scoring at or below `min_rank` are dropped.
    async fn search_posts(
        &self,
        query: &str,
        min_rank: f32,
        include_unlisted: bool,
    ) -> Result<Vec<PostInfo>, RepoError>;

    async fn find_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError>;

    async fn list_post_ids(&self) -> Result<Vec<String>, RepoError>;

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// `Ok(None)` when `current_id` does not exist; a taken `id` yields `Duplicate`.
    async fn update_post(&self, params: UpdatePostParams)
    -> Result<Option<PostRecord>, RepoError>;

    async fn delete_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError>;
}

/// The ordered featured list stored on the globals row.
#[async_trait]
pub trait FeaturedRepo: Send + Sync {
    async fn list_featured_ids(&self) -> Result<Vec<String>, RepoError>;

    /// Existing posts in stored order; dangling IDs are skipped.
    async fn list_featured_posts(&self, include_unlisted: bool)
    -> Result<Vec<PostInfo>, RepoError>;

    async fn replace_featured_ids(&self, ids: &[String]) -> Result<(), RepoError>;

    async fn rename_featured_id(&self, old_id: &str, new_id: &str) -> Result<(), RepoError>;

    async fn remove_featured_id(&self, id: &str) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CredentialsRepo: Send + Sync {
    async fn load_password_hash(&self) -> Result<Option<String>, RepoError>;

    async fn store_password_hash(&self, hash: &str) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn insert_session(&self, session: &SessionRecord) -> Result<(), RepoError>;

    /// Deletes sessions created strictly before `cutoff`, returning how many went.
    async fn purge_sessions_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError>;

    async fn session_exists(&self, id: &str) -> Result<bool, RepoError>;

    async fn delete_session(&self, id: &str) -> Result<bool, RepoError>;

    async fn delete_all_sessions(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{key}` not found")]
    NotFound { key: String },
    #[error("object key `{key}` is invalid")]
    InvalidKey { key: String },
    #[error("storage backend failure")]
    Backend {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl StorageError {
    pub fn backend(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Backend {
            source: Box::new(source),
        }
    }
}

/// Metadata of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub modified: OffsetDateTime,
    pub etag: Option<String>,
}

pub type ObjectStream = BoxStream<'static, Result<Bytes, StorageError>>;

pub struct ObjectDownload {
    pub object: StoredObject,
    pub stream: ObjectStream,
}

/// Flat key/value object storage. Keys are `/`-separated and listing
/// matches whole path segments, so prefix `posts/a` never yields `posts/a-b/x`.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;

    async fn head(&self, key: &str) -> Result<StoredObject, StorageError>;

    async fn get(&self, key: &str) -> Result<ObjectDownload, StorageError>;

    /// Overwrites any existing object under `key`.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError>;

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError>;

    /// Missing objects are not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn delete_many(&self, keys: Vec<String>) -> Result<(), StorageError>;
}
