//! Attachment storage backed by `object_store` (S3/MinIO, local filesystem or memory).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use object_store::{
    ObjectMeta, ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory,
    path::Path as ObjectPath,
};
use time::OffsetDateTime;

use crate::application::repos::{AttachmentStore, ObjectDownload, StorageError, StoredObject};
use crate::config::StorageBackend;

use super::error::InfraError;

#[derive(Debug, Clone)]
pub struct ObjectAttachmentStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectAttachmentStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    pub async fn from_backend(backend: &StorageBackend) -> Result<Self, InfraError> {
        let inner: Arc<dyn ObjectStore> = match backend {
            StorageBackend::Memory => Arc::new(InMemory::new()),
            StorageBackend::Local { path } => {
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|err| InfraError::storage(err.to_string()))?,
                )
            }
            StorageBackend::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => Arc::new(
                AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region)
                    .with_allow_http(endpoint.starts_with("http://"))
                    .build()
                    .map_err(|err| InfraError::storage(err.to_string()))?,
            ),
        };

        Ok(Self::new(inner))
    }
}

fn parse_key(key: &str) -> Result<ObjectPath, StorageError> {
    ObjectPath::parse(key).map_err(|_| StorageError::InvalidKey {
        key: key.to_string(),
    })
}

fn map_error(key: &str, err: object_store::Error) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound {
            key: key.to_string(),
        },
        object_store::Error::InvalidPath { .. } => StorageError::InvalidKey {
            key: key.to_string(),
        },
        other => StorageError::backend(other),
    }
}

fn to_offset_datetime(value: DateTime<Utc>) -> OffsetDateTime {
    value
        .timestamp_nanos_opt()
        .and_then(|nanos| OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos)).ok())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

fn stored_object(meta: &ObjectMeta) -> StoredObject {
    StoredObject {
        key: meta.location.to_string(),
        size: meta.size as u64,
        modified: to_offset_datetime(meta.last_modified),
        etag: meta.e_tag.clone(),
    }
}

#[async_trait]
impl AttachmentStore for ObjectAttachmentStore {
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let prefix_path = parse_key(prefix)?;
        let metas: Vec<ObjectMeta> = self
            .inner
            .list(Some(&prefix_path))
            .try_collect()
            .await
            .map_err(|err| map_error(prefix, err))?;

        Ok(metas.iter().map(stored_object).collect())
    }

    async fn head(&self, key: &str) -> Result<StoredObject, StorageError> {
        let path = parse_key(key)?;
        let meta = self
            .inner
            .head(&path)
            .await
            .map_err(|err| map_error(key, err))?;
        Ok(stored_object(&meta))
    }

    async fn get(&self, key: &str) -> Result<ObjectDownload, StorageError> {
        let path = parse_key(key)?;
        let result = self
            .inner
            .get(&path)
            .await
            .map_err(|err| map_error(key, err))?;
        let object = stored_object(&result.meta);
        let owned_key = key.to_string();
        let stream = result
            .into_stream()
            .map_err(move |err| map_error(&owned_key, err))
            .boxed();

        Ok(ObjectDownload { object, stream })
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        let path = parse_key(key)?;
        self.inner
            .put(&path, data.into())
            .await
            .map_err(|err| map_error(key, err))?;
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let source = parse_key(from)?;
        let destination = parse_key(to)?;
        self.inner
            .copy(&source, &destination)
            .await
            .map_err(|err| map_error(from, err))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = parse_key(key)?;
        match self.inner.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(map_error(key, err)),
        }
    }

    async fn delete_many(&self, keys: Vec<String>) -> Result<(), StorageError> {
        let paths = keys
            .iter()
            .map(|key| parse_key(key))
            .collect::<Result<Vec<_>, _>>()?;
        let locations = stream::iter(paths.into_iter().map(Ok)).boxed();

        let mut deleted = self.inner.delete_stream(locations);
        while let Some(outcome) = deleted.next().await {
            match outcome {
                Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
                Err(err) => return Err(StorageError::backend(err)),
            }
        }
        Ok(())
    }
}
