use std::sync::Arc;

use crate::application::{
    attachments::AttachmentService, credentials::CredentialService, posts::PostService,
    sessions::SessionService,
};

use super::rate_limit::AttemptLimiter;

#[derive(Clone)]
pub struct HttpState {
    pub credentials: Arc<CredentialService>,
    pub sessions: Arc<SessionService>,
    pub posts: Arc<PostService>,
    pub attachments: Arc<AttachmentService>,
    pub attempts: AttemptLimiter,
}
