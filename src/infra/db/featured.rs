use async_trait::async_trait;

use crate::{
    application::repos::{FeaturedRepo, RepoError},
    domain::entities::PostInfo,
};

use super::{PostgresRepositories, map_sqlx_error, posts::PostInfoRow};

#[async_trait]
impl FeaturedRepo for PostgresRepositories {
    async fn list_featured_ids(&self) -> Result<Vec<String>, RepoError> {
        let ids = sqlx::query_scalar::<_, Vec<String>>(
            "SELECT featured_posts FROM globals WHERE singleton",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ids.unwrap_or_default())
    }

    async fn list_featured_posts(
        &self,
        include_unlisted: bool,
    ) -> Result<Vec<PostInfo>, RepoError> {
        let rows = sqlx::query_as::<_, PostInfoRow>(
            r#"
            SELECT p.id, p.type AS post_type, p.unlisted, p.created, p.updated,
                   p.title, p.description
            FROM globals g
            CROSS JOIN LATERAL unnest(g.featured_posts) WITH ORDINALITY AS f(post_id, position)
            JOIN posts p ON p.id = f.post_id
            WHERE g.singleton AND ($1 OR p.unlisted = FALSE)
            ORDER BY f.position
            "#,
        )
        .bind(include_unlisted)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostInfo::from).collect())
    }

    async fn replace_featured_ids(&self, ids: &[String]) -> Result<(), RepoError> {
        sqlx::query("UPDATE globals SET featured_posts = $1 WHERE singleton")
            .bind(ids)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rename_featured_id(&self, old_id: &str, new_id: &str) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE globals SET featured_posts = array_replace(featured_posts, $1, $2) \
             WHERE singleton",
        )
        .bind(old_id)
        .bind(new_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn remove_featured_id(&self, id: &str) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE globals SET featured_posts = array_remove(featured_posts, $1) \
             WHERE singleton",
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
