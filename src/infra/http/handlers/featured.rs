use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;

use crate::domain::entities::PostInfo;
use crate::infra::http::{
    error::ApiError,
    session::{optional_session, require_session},
    state::HttpState,
    validate::JsonBody,
};

use super::MessageResponse;

pub async fn get_featured(
    State(state): State<HttpState>,
    jar: CookieJar,
) -> Result<Json<Vec<PostInfo>>, ApiError> {
    let include_unlisted = optional_session(&state, &jar).await?;
    let posts = state.posts.featured(include_unlisted).await?;
    Ok(Json(posts))
}

pub async fn set_featured(
    State(state): State<HttpState>,
    jar: CookieJar,
    body: Result<JsonBody, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_session(&state, &jar).await?;
    let JsonBody(body) = body?;
    let ids = featured_ids(&body).ok_or_else(|| {
        ApiError::bad_request(
            "Featured posts were either not provided or their format was invalid.",
        )
    })?;

    state.posts.set_featured(ids).await?;
    Ok(Json(MessageResponse {
        message: "Successfully updated featured posts.",
    }))
}

fn featured_ids(body: &Value) -> Option<Vec<String>> {
    body.get("posts")?
        .as_array()?
        .iter()
        .map(|value| value.as_str().map(str::to_string))
        .collect()
}
