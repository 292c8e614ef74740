//! Post lifecycle: creation from a template, updates that cascade an ID
//! change into the featured list and the attachment namespace, deletion with
//! cleanup, search and the featured list.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::application::attachments::{AttachmentError, AttachmentService};
use crate::application::repos::{
    CreatePostParams, FeaturedRepo, PostsRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{PostInfo, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::names::validate_post_id;
use crate::domain::post_id::generate_post_id;
use crate::domain::posts::{COVER_FILE_NAME, PostTemplate};
use crate::domain::types::PostType;

pub const DEFAULT_MIN_RANK: f32 = 0.05;

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post `{id}` does not exist")]
    NotFound { id: String },
    #[error("post id `{id}` is already taken")]
    IdTaken { id: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Attachments(#[from] AttachmentError),
}

#[derive(Debug, Clone)]
pub struct UpdatePostCommand {
    pub id: String,
    pub post_type: PostType,
    pub unlisted: bool,
    pub title: String,
    pub description: String,
    pub content: String,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    featured: Arc<dyn FeaturedRepo>,
    attachments: AttachmentService,
    cover: Bytes,
    min_rank: f32,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        featured: Arc<dyn FeaturedRepo>,
        attachments: AttachmentService,
        cover: Bytes,
        min_rank: f32,
    ) -> Self {
        Self {
            posts,
            featured,
            attachments,
            cover,
            min_rank,
        }
    }

    pub async fn list(&self, include_unlisted: bool) -> Result<Vec<PostInfo>, PostServiceError> {
        Ok(self.posts.list_posts(include_unlisted).await?)
    }

    /// A blank or absent query falls back to the default listing.
    pub async fn search(
        &self,
        query: Option<&str>,
        include_unlisted: bool,
    ) -> Result<Vec<PostInfo>, PostServiceError> {
        match query.map(str::trim).filter(|query| !query.is_empty()) {
            Some(query) => Ok(self
                .posts
                .search_posts(query, self.min_rank, include_unlisted)
                .await?),
            None => self.list(include_unlisted).await,
        }
    }

    pub async fn get(&self, id: &str) -> Result<PostRecord, PostServiceError> {
        self.posts
            .find_post(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound { id: id.to_string() })
    }

    /// Inserts a templated post and uploads its default cover. A failed
    /// upload deletes the row again.
    pub async fn create(&self) -> Result<PostRecord, PostServiceError> {
        let taken: HashSet<String> = self.posts.list_post_ids().await?.into_iter().collect();
        let id = {
            let mut rng = rand::thread_rng();
            generate_post_id(&mut rng, OffsetDateTime::now_utc(), |candidate| {
                taken.contains(candidate)
            })
        };

        let template = PostTemplate::from_id(id);
        let candidate = template.id.clone();
        let record = self
            .posts
            .create_post(CreatePostParams {
                id: template.id,
                post_type: template.post_type,
                title: template.title,
                description: template.description,
                content: template.content,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => PostServiceError::IdTaken { id: candidate },
                other => other.into(),
            })?;

        if let Err(err) = self
            .attachments
            .upload(&record.id, COVER_FILE_NAME, self.cover.clone())
            .await
        {
            if let Err(rollback) = self.posts.delete_post(&record.id).await {
                error!(
                    target = "folio::posts",
                    id = %record.id,
                    error = %rollback,
                    "failed to roll back post after cover upload failure",
                );
            }
            return Err(err.into());
        }

        info!(target = "folio::posts", id = %record.id, "post created");
        Ok(record)
    }

    pub async fn update(
        &self,
        current_id: &str,
        command: UpdatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        validate_post_id(&command.id)?;
        let new_id = command.id.clone();

        let record = self
            .posts
            .update_post(UpdatePostParams {
                current_id: current_id.to_string(),
                id: command.id,
                post_type: command.post_type,
                unlisted: command.unlisted,
                title: command.title,
                description: command.description,
                content: command.content,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => PostServiceError::IdTaken { id: new_id },
                other => other.into(),
            })?
            .ok_or_else(|| PostServiceError::NotFound {
                id: current_id.to_string(),
            })?;

        if record.id != current_id {
            self.featured
                .rename_featured_id(current_id, &record.id)
                .await?;
            self.attachments
                .rename_namespace(current_id, &record.id)
                .await?;
            info!(
                target = "folio::posts",
                from = current_id,
                to = %record.id,
                "post renamed",
            );
        }

        info!(target = "folio::posts", id = %record.id, "post updated");
        Ok(record)
    }

    /// Row deletion is authoritative; featured and attachment cleanup follow.
    pub async fn delete(&self, id: &str) -> Result<PostRecord, PostServiceError> {
        let record = self
            .posts
            .delete_post(id)
            .await?
            .ok_or_else(|| PostServiceError::NotFound { id: id.to_string() })?;

        self.featured.remove_featured_id(id).await?;
        let removed = self.attachments.delete_all(id).await?;

        info!(
            target = "folio::posts",
            id,
            attachments = removed,
            "post deleted",
        );
        Ok(record)
    }

    pub async fn featured(
        &self,
        include_unlisted: bool,
    ) -> Result<Vec<PostInfo>, PostServiceError> {
        Ok(self.featured.list_featured_posts(include_unlisted).await?)
    }

    /// Stores `ids` verbatim; existence is not checked.
    pub async fn set_featured(&self, ids: Vec<String>) -> Result<(), PostServiceError> {
        self.featured.replace_featured_ids(&ids).await?;
        info!(target = "folio::posts", count = ids.len(), "featured posts replaced");
        Ok(())
    }
}
