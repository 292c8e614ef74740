use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tokio::task;
use tracing::info;

use crate::application::repos::{CredentialsRepo, RepoError};
use crate::application::sessions::{SessionError, SessionService};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// The single admin password, stored as an Argon2id PHC string.
#[derive(Clone)]
pub struct CredentialService {
    repo: Arc<dyn CredentialsRepo>,
    sessions: SessionService,
}

impl CredentialService {
    pub fn new(repo: Arc<dyn CredentialsRepo>, sessions: SessionService) -> Self {
        Self { repo, sessions }
    }

    /// `Ok(false)` for a mismatch or when no password was ever set.
    pub async fn verify(&self, candidate: &str) -> Result<bool, CredentialError> {
        let Some(hash) = self.repo.load_password_hash().await? else {
            return Ok(false);
        };
        let candidate = candidate.to_owned();
        task::spawn_blocking(move || verify_password(&candidate, &hash))
            .await
            .map_err(|err| CredentialError::Hash(err.to_string()))?
    }

    /// Stores a new hash and revokes every session, returning the revoked count.
    pub async fn rotate(&self, new_secret: &str) -> Result<u64, CredentialError> {
        let secret = new_secret.to_owned();
        let hash = task::spawn_blocking(move || hash_password(&secret))
            .await
            .map_err(|err| CredentialError::Hash(err.to_string()))??;
        self.repo.store_password_hash(&hash).await?;
        let revoked = self.sessions.revoke_all().await?;
        info!(target = "folio::auth", revoked, "admin password rotated");
        Ok(revoked)
    }
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CredentialError::Hash(err.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    let parsed = PasswordHash::new(hash).map_err(|err| CredentialError::Hash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
