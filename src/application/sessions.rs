use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo};
use crate::domain::entities::SessionRecord;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Opaque server-side sessions with a fixed lifetime and lazy expiry.
#[derive(Clone)]
pub struct SessionService {
    repo: Arc<dyn SessionsRepo>,
    lifetime: Duration,
}

impl SessionService {
    pub fn new(repo: Arc<dyn SessionsRepo>, lifetime: Duration) -> Self {
        Self { repo, lifetime }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub async fn create(&self) -> Result<SessionRecord, SessionError> {
        let session = SessionRecord {
            id: Uuid::new_v4().to_string(),
            created: OffsetDateTime::now_utc(),
        };
        self.repo.insert_session(&session).await?;
        Ok(session)
    }

    /// Purges every expired session, then reports whether `id` survived.
    pub async fn validate(&self, id: &str) -> Result<bool, SessionError> {
        let cutoff = OffsetDateTime::now_utc() - self.lifetime;
        let purged = self.repo.purge_sessions_before(cutoff).await?;
        if purged > 0 {
            metrics::counter!("folio_sessions_purged_total").increment(purged);
            debug!(target = "folio::sessions", purged, "expired sessions purged");
        }

        Ok(self.repo.session_exists(id).await?)
    }

    /// Returns whether a session was actually removed.
    pub async fn revoke(&self, id: &str) -> Result<bool, SessionError> {
        Ok(self.repo.delete_session(id).await?)
    }

    pub async fn revoke_all(&self) -> Result<u64, SessionError> {
        let revoked = self.repo.delete_all_sessions().await?;
        info!(target = "folio::sessions", revoked, "all sessions revoked");
        Ok(revoked)
    }
}
