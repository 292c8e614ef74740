use std::error::Error as StdError;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::attachments::AttachmentError;
use crate::application::credentials::CredentialError;
use crate::application::error::ErrorReport;
use crate::application::posts::PostServiceError;
use crate::application::sessions::SessionError;
use crate::domain::error::DomainError;

use super::session::removal_cookie;

pub mod codes {
    pub const METHOD_NOT_ALLOWED: &str = "method-not-allowed";
    pub const NOT_FOUND: &str = "not-found";
    pub const BAD_REQUEST: &str = "bad-request";
    pub const INVALID_SESSION: &str = "invalid-session";
    pub const DOES_NOT_EXIST: &str = "does-not-exist";
    pub const FILE_NOT_FOUND: &str = "file-not-found";
    pub const INVALID_TYPE: &str = "invalid-type";
    pub const INVALID_POST_ID: &str = "invalid-post-id";
    pub const INVALID_FILE_NAME: &str = "invalid-file-name";
    pub const ID_TAKEN: &str = "id-taken";
    pub const INVALID_FILE_DATA: &str = "invalid-file-data";
    pub const FILE_TOO_LARGE: &str = "file-too-large";
    pub const TOO_MANY_ATTEMPTS: &str = "too-many-attempts";
    pub const STORAGE_ERROR: &str = "storage-error";
    pub const INTERNAL: &str = "internal-server-error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
    report: Option<ErrorReport>,
    clear_session: bool,
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            report: None,
            clear_session: false,
            retry_after: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    /// A field-specific validation failure such as `empty-post-title`.
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            codes::METHOD_NOT_ALLOWED,
            "This method is not allowed.",
        )
    }

    pub fn route_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "This route does not exist.",
        )
    }

    /// 401 that also tells the client to drop its session cookie.
    pub fn invalid_session() -> Self {
        let mut error = Self::new(
            StatusCode::UNAUTHORIZED,
            codes::INVALID_SESSION,
            "The session is invalid.",
        );
        error.clear_session = true;
        error
    }

    pub fn post_does_not_exist() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            codes::DOES_NOT_EXIST,
            "This post does not exist.",
        )
    }

    pub fn file_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            codes::FILE_NOT_FOUND,
            "That file does not exist.",
        )
    }

    pub fn invalid_file_data() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_FILE_DATA,
            "File data is not valid base64.",
        )
    }

    pub fn file_too_large() -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::FILE_TOO_LARGE,
            "File is too large.",
        )
    }

    pub fn too_many_attempts(retry_after: u64) -> Self {
        let mut error = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            codes::TOO_MANY_ATTEMPTS,
            "Too many password attempts. Try again later.",
        );
        error.retry_after = Some(retry_after);
        error
    }

    pub fn storage(source: &'static str, error: &dyn StdError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self::new(status, codes::STORAGE_ERROR, "Unknown storage error.")
            .with_report(ErrorReport::from_error(source, status, error))
    }

    pub fn internal(source: &'static str, error: &dyn StdError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self::new(
            status,
            codes::INTERNAL,
            "An internal server error occurred.",
        )
        .with_report(ErrorReport::from_error(source, status, error))
    }

    pub fn with_report(mut self, report: ErrorReport) -> Self {
        self.report = Some(report);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                "infra::http",
                self.status,
                format!("{}: {}", self.code, self.message),
            )
        });
        let body = ApiErrorBody {
            error: self.code,
            message: self.message,
        };
        let mut response = (self.status, Json(body)).into_response();

        if self.clear_session
            && let Ok(value) = HeaderValue::from_str(&removal_cookie().to_string())
        {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        if let Some(retry_after) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }

        // Attach a structured report so shared logging middleware can emit rich diagnostics.
        report.attach(&mut response);
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::UnknownPostType { value } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_TYPE,
                format!("Post type \"{value}\" is invalid."),
            ),
            DomainError::InvalidPostId { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_POST_ID,
                "Post IDs may only contain letters, digits, hyphens and underscores.",
            ),
            DomainError::InvalidFileName { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_FILE_NAME,
                "File names must be a single path segment without control characters.",
            ),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        Self::internal("infra::http::sessions", &error)
    }
}

impl From<CredentialError> for ApiError {
    fn from(error: CredentialError) -> Self {
        Self::internal("infra::http::credentials", &error)
    }
}

impl From<AttachmentError> for ApiError {
    fn from(error: AttachmentError) -> Self {
        match error {
            AttachmentError::NotFound { .. } => Self::file_not_found(),
            AttachmentError::Domain(err) => err.into(),
            AttachmentError::Storage(_) | AttachmentError::PartialRename { .. } => {
                Self::storage("infra::http::attachments", &error)
            }
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(error: PostServiceError) -> Self {
        match error {
            PostServiceError::NotFound { .. } => Self::post_does_not_exist(),
            PostServiceError::IdTaken { .. } => Self::new(
                StatusCode::CONFLICT,
                codes::ID_TAKEN,
                "A post with this ID already exists.",
            ),
            PostServiceError::Domain(err) => err.into(),
            PostServiceError::Attachments(err) => err.into(),
            PostServiceError::Repo(_) => Self::internal("infra::http::posts", &error),
        }
    }
}
