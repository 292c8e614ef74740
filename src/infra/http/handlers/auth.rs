use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::{info, warn};

use crate::infra::http::{
    error::ApiError,
    session::{removal_cookie, session_cookie, session_id},
    state::HttpState,
    validate::{JsonBody, validate_string, validate_text},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub signed_in: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutResponse {
    pub signed_out: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ValidateSessionResponse {
    pub valid: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordResponse {
    pub password_changed: bool,
    pub message: &'static str,
}

pub async fn sign_in(
    State(state): State<HttpState>,
    jar: CookieJar,
    JsonBody(body): JsonBody,
) -> Result<(CookieJar, Json<SignInResponse>), ApiError> {
    let password = validate_string(body.get("password"), "password")?;

    if !state.credentials.verify(password).await? {
        metrics::counter!("folio_sign_in_total", "outcome" => "rejected").increment(1);
        warn!(target = "folio::auth", "sign-in rejected");
        return Ok((
            jar,
            Json(SignInResponse {
                signed_in: false,
                message: "Incorrect password.",
            }),
        ));
    }

    let session = state.sessions.create().await?;
    metrics::counter!("folio_sign_in_total", "outcome" => "accepted").increment(1);
    info!(target = "folio::auth", "sign-in accepted");

    let jar = jar.add(session_cookie(session.id, state.sessions.lifetime()));
    Ok((
        jar,
        Json(SignInResponse {
            signed_in: true,
            message: "Successfully signed in.",
        }),
    ))
}

pub async fn sign_out(
    State(state): State<HttpState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SignOutResponse>), ApiError> {
    let id = validate_text(session_id(&jar), "session")?;
    let revoked = state.sessions.revoke(id).await?;
    let jar = jar.add(removal_cookie());

    if !revoked {
        return Ok((
            jar,
            Json(SignOutResponse {
                signed_out: false,
                message: "Session was not found.",
            }),
        ));
    }

    info!(target = "folio::auth", "session revoked");
    Ok((
        jar,
        Json(SignOutResponse {
            signed_out: true,
            message: "Successfully signed out.",
        }),
    ))
}

pub async fn validate_session(
    State(state): State<HttpState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ValidateSessionResponse>), ApiError> {
    let Some(id) = session_id(&jar).filter(|id| !id.is_empty()) else {
        return Ok((
            jar,
            Json(ValidateSessionResponse {
                valid: false,
                message: "No session was provided.",
            }),
        ));
    };

    if !state.sessions.validate(id).await? {
        let jar = jar.add(removal_cookie());
        return Ok((
            jar,
            Json(ValidateSessionResponse {
                valid: false,
                message: "Session is invalid.",
            }),
        ));
    }

    Ok((
        jar,
        Json(ValidateSessionResponse {
            valid: true,
            message: "Session is valid.",
        }),
    ))
}

pub async fn change_password(
    State(state): State<HttpState>,
    JsonBody(body): JsonBody,
) -> Result<Json<ChangePasswordResponse>, ApiError> {
    let old_password = validate_string(body.get("oldPassword"), "password")?;

    if !state.credentials.verify(old_password).await? {
        warn!(target = "folio::auth", "password change rejected");
        return Ok(Json(ChangePasswordResponse {
            password_changed: false,
            message: "Incorrect password.",
        }));
    }

    let new_password = validate_string(body.get("newPassword"), "new password")?;
    state.credentials.rotate(new_password).await?;

    Ok(Json(ChangePasswordResponse {
        password_changed: true,
        message: "Successfully changed the password.",
    }))
}
