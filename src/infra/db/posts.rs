use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{CreatePostParams, PostsRepo, RepoError, UpdatePostParams},
    domain::{
        entities::{PostInfo, PostRecord},
        types::PostType,
    },
};

use super::{POST_COLUMNS, POST_INFO_COLUMNS, PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
pub(super) struct PostInfoRow {
    id: String,
    post_type: PostType,
    unlisted: bool,
    created: OffsetDateTime,
    updated: OffsetDateTime,
    title: String,
    description: String,
}

impl From<PostInfoRow> for PostInfo {
    fn from(row: PostInfoRow) -> Self {
        Self {
            id: row.id,
            post_type: row.post_type,
            unlisted: row.unlisted,
            created: row.created,
            updated: row.updated,
            title: row.title,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    post_type: PostType,
    unlisted: bool,
    created: OffsetDateTime,
    updated: OffsetDateTime,
    title: String,
    description: String,
    content: String,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            post_type: row.post_type,
            unlisted: row.unlisted,
            created: row.created,
            updated: row.updated,
            title: row.title,
            description: row.description,
            content: row.content,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self, include_unlisted: bool) -> Result<Vec<PostInfo>, RepoError> {
        let sql = format!(
            "SELECT {POST_INFO_COLUMNS} FROM posts \
             WHERE ($1 OR unlisted = FALSE) \
             ORDER BY created DESC"
        );
        let rows = sqlx::query_as::<_, PostInfoRow>(&sql)
            .bind(include_unlisted)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostInfo::from).collect())
    }

    async fn search_posts(
        &self,
        query: &str,
        min_rank: f32,
        include_unlisted: bool,
    ) -> Result<Vec<PostInfo>, RepoError> {
        let rows = sqlx::query_as::<_, PostInfoRow>(
            r#"
            WITH ranking AS (
                SELECT id, type AS post_type, unlisted, created, updated, title, description,
                       ts_rank(ts, phraseto_tsquery('english', $1)) AS rank
                FROM posts
            )
            SELECT id, post_type, unlisted, created, updated, title, description
            FROM ranking
            WHERE rank > $2 AND ($3 OR unlisted = FALSE)
            ORDER BY rank DESC, created DESC
            "#,
        )
        .bind(query)
        .bind(min_rank)
        .bind(include_unlisted)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostInfo::from).collect())
    }

    async fn find_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn list_post_ids(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>("SELECT id FROM posts")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "INSERT INTO posts (id, type, title, description, content) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(&params.id)
            .bind(params.post_type)
            .bind(&params.title)
            .bind(&params.description)
            .bind(&params.content)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(
        &self,
        params: UpdatePostParams,
    ) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!(
            "UPDATE posts \
             SET id = $1, type = $2, unlisted = $3, title = $4, description = $5, \
                 content = $6, updated = NOW() \
             WHERE id = $7 \
             RETURNING {POST_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(&params.id)
            .bind(params.post_type)
            .bind(params.unlisted)
            .bind(&params.title)
            .bind(&params.description)
            .bind(&params.content)
            .bind(&params.current_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn delete_post(&self, id: &str) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}
