mod auth;
mod featured;
mod files;
mod posts;

pub use auth::{change_password, sign_in, sign_out, validate_session};
pub use featured::{get_featured, set_featured};
pub use files::{delete_file, download_file, rename_file, upload_file};
pub use posts::{create_post, delete_post, get_post, list_posts, update_post};

use serde::Serialize;

use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

pub async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}
