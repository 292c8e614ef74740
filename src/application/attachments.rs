//! Per-post attachment namespaces on top of an [`AttachmentStore`].
//!
//! Every post owns the key prefix `posts/{id}/`; attachments are addressed
//! by name inside that prefix. Post IDs are checked before any key is built
//! so a decoded path segment can never reach into another namespace.
//! Renames are copy-then-delete because object stores offer no atomic
//! rename, and namespace-wide operations are best-effort: a failure part way
//! leaves the remaining objects in place.

use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, stream};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{AttachmentStore, ObjectStream, StorageError, StoredObject};
use crate::domain::entities::AttachmentInfo;
use crate::domain::error::DomainError;
use crate::domain::names::{validate_file_name, validate_post_id};

pub const POSTS_PREFIX: &str = "posts";

const RENAME_CONCURRENCY: usize = 8;

pub fn namespace(post_id: &str) -> String {
    format!("{POSTS_PREFIX}/{post_id}")
}

pub fn object_key(post_id: &str, name: &str) -> String {
    format!("{POSTS_PREFIX}/{post_id}/{name}")
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment `{name}` of post `{post_id}` not found")]
    NotFound { post_id: String, name: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("moved {moved} of {total} attachments from `{from}` to `{to}`")]
    PartialRename {
        from: String,
        to: String,
        moved: usize,
        total: usize,
    },
}

/// Outcome of a conditional download.
pub enum Download {
    NotModified {
        etag: String,
    },
    Content {
        etag: Option<String>,
        size: u64,
        stream: ObjectStream,
    },
}

#[derive(Clone)]
pub struct AttachmentService {
    store: Arc<dyn AttachmentStore>,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn AttachmentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, post_id: &str) -> Result<Vec<AttachmentInfo>, AttachmentError> {
        validate_post_id(post_id)?;
        let prefix = format!("{}/", namespace(post_id));
        let objects = self
            .store
            .list(&namespace(post_id))
            .await
            .map_err(|err| storage_failure("list", err))?;

        let mut attachments: Vec<AttachmentInfo> = objects
            .into_iter()
            .filter_map(|object| {
                let name = object.key.strip_prefix(&prefix)?.to_string();
                Some(AttachmentInfo {
                    name,
                    size: object.size,
                    modified: object.modified,
                })
            })
            .collect();
        attachments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(attachments)
    }

    pub async fn upload(
        &self,
        post_id: &str,
        name: &str,
        data: Bytes,
    ) -> Result<(), AttachmentError> {
        validate_post_id(post_id)?;
        validate_file_name(name)?;
        self.store
            .put(&object_key(post_id, name), data)
            .await
            .map_err(|err| storage_failure("upload", err))
    }

    /// Answers `NotModified` when `if_none_match` matches the current fingerprint.
    pub async fn download(
        &self,
        post_id: &str,
        name: &str,
        if_none_match: Option<&str>,
    ) -> Result<Download, AttachmentError> {
        validate_post_id(post_id)?;
        let key = object_key(post_id, name);
        let object = self
            .store
            .head(&key)
            .await
            .map_err(|err| missing_or_failure("download", err, post_id, name))?;

        if let (Some(header), Some(etag)) = (if_none_match, object.etag.as_deref()) {
            let etag = quote_etag(etag);
            if etag_matches(header, &etag) {
                return Ok(Download::NotModified { etag });
            }
        }

        let download = self
            .store
            .get(&key)
            .await
            .map_err(|err| missing_or_failure("download", err, post_id, name))?;

        Ok(Download::Content {
            etag: download.object.etag.as_deref().map(quote_etag),
            size: download.object.size,
            stream: download.stream,
        })
    }

    pub async fn rename(
        &self,
        post_id: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), AttachmentError> {
        validate_post_id(post_id)?;
        validate_file_name(new_name)?;
        let from = object_key(post_id, old_name);
        if old_name == new_name {
            self.store
                .head(&from)
                .await
                .map_err(|err| missing_or_failure("rename", err, post_id, old_name))?;
            return Ok(());
        }

        let to = object_key(post_id, new_name);
        self.store
            .copy(&from, &to)
            .await
            .map_err(|err| missing_or_failure("rename", err, post_id, old_name))?;
        self.store
            .delete(&from)
            .await
            .map_err(|err| storage_failure("rename", err))
    }

    pub async fn delete(&self, post_id: &str, name: &str) -> Result<(), AttachmentError> {
        validate_post_id(post_id)?;
        let key = object_key(post_id, name);
        self.store
            .head(&key)
            .await
            .map_err(|err| missing_or_failure("delete", err, post_id, name))?;
        self.store
            .delete(&key)
            .await
            .map_err(|err| storage_failure("delete", err))
    }

    /// Removes the whole namespace of `post_id`, returning how many objects it held.
    pub async fn delete_all(&self, post_id: &str) -> Result<usize, AttachmentError> {
        validate_post_id(post_id)?;
        let keys: Vec<String> = self
            .store
            .list(&namespace(post_id))
            .await
            .map_err(|err| storage_failure("delete_all", err))?
            .into_iter()
            .map(|object| object.key)
            .collect();
        let total = keys.len();
        if total == 0 {
            return Ok(0);
        }

        self.store
            .delete_many(keys)
            .await
            .map_err(|err| storage_failure("delete_all", err))?;
        Ok(total)
    }

    /// Moves every object under `posts/{old}/` to `posts/{new}/` concurrently.
    pub async fn rename_namespace(
        &self,
        old_post_id: &str,
        new_post_id: &str,
    ) -> Result<usize, AttachmentError> {
        validate_post_id(old_post_id)?;
        validate_post_id(new_post_id)?;
        if old_post_id == new_post_id {
            return Ok(0);
        }

        let old_prefix = format!("{}/", namespace(old_post_id));
        let new_prefix = format!("{}/", namespace(new_post_id));
        let objects: Vec<StoredObject> = self
            .store
            .list(&namespace(old_post_id))
            .await
            .map_err(|err| storage_failure("rename_namespace", err))?;
        let total = objects.len();

        let moves = objects.into_iter().filter_map(|object| {
            let rest = object.key.strip_prefix(&old_prefix)?;
            Some((object.key.clone(), format!("{new_prefix}{rest}")))
        });

        let results: Vec<(String, Result<(), StorageError>)> = stream::iter(moves)
            .map(|(from, to)| {
                let store = Arc::clone(&self.store);
                async move {
                    let outcome = match store.copy(&from, &to).await {
                        Ok(()) => store.delete(&from).await,
                        Err(err) => Err(err),
                    };
                    (from, outcome)
                }
            })
            .buffer_unordered(RENAME_CONCURRENCY)
            .collect()
            .await;

        let mut moved = 0;
        for (key, outcome) in results {
            match outcome {
                Ok(()) => moved += 1,
                Err(err) => {
                    metrics::counter!("folio_storage_errors_total", "operation" => "rename_namespace")
                        .increment(1);
                    warn!(
                        target = "folio::attachments",
                        key = %key,
                        error = %err,
                        "attachment left behind during namespace rename",
                    );
                }
            }
        }

        if moved < total {
            return Err(AttachmentError::PartialRename {
                from: old_post_id.to_string(),
                to: new_post_id.to_string(),
                moved,
                total,
            });
        }

        info!(
            target = "folio::attachments",
            from = old_post_id,
            to = new_post_id,
            moved,
            "attachment namespace renamed",
        );
        Ok(moved)
    }
}

fn storage_failure(operation: &'static str, err: StorageError) -> AttachmentError {
    if !matches!(err, StorageError::NotFound { .. }) {
        metrics::counter!("folio_storage_errors_total", "operation" => operation).increment(1);
    }
    AttachmentError::Storage(err)
}

fn missing_or_failure(
    operation: &'static str,
    err: StorageError,
    post_id: &str,
    name: &str,
) -> AttachmentError {
    match err {
        StorageError::NotFound { .. } | StorageError::InvalidKey { .. } => {
            AttachmentError::NotFound {
                post_id: post_id.to_string(),
                name: name.to_string(),
            }
        }
        other => storage_failure(operation, other),
    }
}

/// Render a backend fingerprint as a quoted entity tag.
pub fn quote_etag(raw: &str) -> String {
    if raw.starts_with('"') || raw.starts_with("W/\"") {
        raw.to_string()
    } else {
        format!("\"{raw}\"")
    }
}

/// Weak comparison of an `If-None-Match` header value against `etag`.
pub fn etag_matches(header: &str, etag: &str) -> bool {
    let etag = etag.trim_start_matches("W/");
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == etag)
}
