//! Session cookie handling and the authorization gate used by handlers.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::error::ApiError;
use super::state::HttpState;
use super::validate::validate_text;

pub const SESSION_COOKIE: &str = "session";

pub fn session_cookie(id: String, lifetime: Duration) -> Cookie<'static> {
    let max_age = time::Duration::seconds(i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX));
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(max_age)
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .build()
}

pub fn session_id(jar: &CookieJar) -> Option<&str> {
    jar.get(SESSION_COOKIE).map(|cookie| cookie.value())
}

/// Mutating endpoints: a missing or invalid session ends the request.
pub async fn require_session(state: &HttpState, jar: &CookieJar) -> Result<(), ApiError> {
    let id = validate_text(session_id(jar), "session")?;
    if state.sessions.validate(id).await? {
        Ok(())
    } else {
        Err(ApiError::invalid_session())
    }
}

/// Read endpoints: no cookie means anonymous, a stale cookie is rejected.
pub async fn optional_session(state: &HttpState, jar: &CookieJar) -> Result<bool, ApiError> {
    match session_id(jar).filter(|id| !id.is_empty()) {
        None => Ok(false),
        Some(_) => require_session(state, jar).await.map(|()| true),
    }
}
