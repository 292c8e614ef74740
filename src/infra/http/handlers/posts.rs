use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::Value;

use crate::application::posts::UpdatePostCommand;
use crate::domain::entities::{PostInfo, PostRecord};
use crate::domain::posts::resolve_attachment_links;
use crate::domain::types::PostType;
use crate::infra::http::{
    error::ApiError,
    session::{optional_session, require_session},
    state::HttpState,
    validate::{JsonBody, validate_boolean, validate_string, validate_text},
};

#[derive(Debug, Serialize)]
pub struct CreatedPostResponse {
    pub id: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: &'static str,
}

pub async fn list_posts(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PostInfo>>, ApiError> {
    let include_unlisted = optional_session(&state, &jar).await?;

    let query = match params.get("search").map(String::as_str) {
        Some(query) if !query.trim().is_empty() => Some(validate_text(Some(query), "search query")?),
        _ => None,
    };

    let posts = state.posts.search(query, include_unlisted).await?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<HttpState>,
    jar: CookieJar,
) -> Result<Json<CreatedPostResponse>, ApiError> {
    require_session(&state, &jar).await?;
    let record = state.posts.create().await?;
    Ok(Json(CreatedPostResponse {
        id: record.id,
        message: "Successfully created a new post.",
    }))
}

/// `?files` lists attachments (session required); `?resolve-links` rewrites
/// `post://` tokens in the content.
pub async fn get_post(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let id = validate_text(Some(&id), "post ID")?;

    if params.contains_key("files") {
        require_session(&state, &jar).await?;
        state.posts.get(id).await?;
        let files = state.attachments.list(id).await?;
        return Ok(Json(files).into_response());
    }

    let mut post: PostRecord = state.posts.get(id).await?;
    if params.contains_key("resolve-links") {
        post.content = resolve_attachment_links(&post.content, &post.id);
    }
    Ok(Json(post).into_response())
}

pub async fn update_post(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(id): Path<String>,
    body: Result<JsonBody, ApiError>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_session(&state, &jar).await?;
    let current_id = validate_text(Some(&id), "post ID")?;
    let JsonBody(body) = body?;
    let command = parse_update(&body)?;

    state.posts.update(current_id, command).await?;
    Ok(Json(SuccessResponse {
        success: true,
        message: "The post was successfully updated.",
    }))
}

pub async fn delete_post(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_session(&state, &jar).await?;
    let id = validate_text(Some(&id), "post ID")?;

    state.posts.delete(id).await?;
    Ok(Json(SuccessResponse {
        success: true,
        message: "The post was successfully deleted.",
    }))
}

fn parse_update(body: &Value) -> Result<UpdatePostCommand, ApiError> {
    let id = validate_string(body.get("id"), "new post ID")?;
    let post_type: PostType = validate_string(body.get("type"), "post type")?.parse()?;
    let unlisted = validate_boolean(body.get("unlisted"), "post unlisted")?;
    let title = validate_string(body.get("title"), "post title")?;
    let description = validate_string(body.get("description"), "post description")?;
    let content = validate_string(body.get("content"), "post content")?;

    Ok(UpdatePostCommand {
        id: id.to_string(),
        post_type,
        unlisted,
        title: title.to_string(),
        description: description.to_string(),
        content: content.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "id": "quantum-tea",
            "type": "digital-art",
            "unlisted": true,
            "title": "Quantum Tea",
            "description": "Steeped",
            "content": "# Quantum Tea",
        })
    }

    #[test]
    fn update_body_is_parsed_into_a_command() {
        let command = parse_update(&body()).expect("valid body");
        assert_eq!(command.id, "quantum-tea");
        assert_eq!(command.post_type, PostType::DigitalArt);
        assert!(command.unlisted);
        assert_eq!(command.content, "# Quantum Tea");
    }

    #[test]
    fn first_invalid_field_wins() {
        let mut value = body();
        value["type"] = json!("poetry");
        value["title"] = json!(5);
        let err = parse_update(&value).expect_err("unknown type");
        assert_eq!(err.code(), "invalid-type");

        let mut value = body();
        value["unlisted"] = json!("no");
        value["content"] = json!("");
        let err = parse_update(&value).expect_err("bad flag");
        assert_eq!(err.code(), "post-unlisted-not-a-boolean");
    }
}
