use async_trait::async_trait;

use crate::application::repos::{CredentialsRepo, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl CredentialsRepo for PostgresRepositories {
    async fn load_password_hash(&self) -> Result<Option<String>, RepoError> {
        let hash = sqlx::query_scalar::<_, Option<String>>(
            "SELECT password_hash FROM globals WHERE singleton",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(hash.flatten())
    }

    async fn store_password_hash(&self, hash: &str) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO globals (singleton, password_hash)
            VALUES (TRUE, $1)
            ON CONFLICT (singleton) DO UPDATE SET password_hash = EXCLUDED.password_hash
            "#,
        )
        .bind(hash)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
