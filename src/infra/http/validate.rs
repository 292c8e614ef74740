//! Field-level input checks producing `<field>-not-a-string` style error codes.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde_json::Value;

use crate::application::error::ErrorReport;

use super::error::ApiError;

pub const MAX_STRING_CHARS: usize = 65_536 * 10;

/// A JSON request body whose rejection renders as a `bad-request` API error.
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::bad_request("The request body is not valid JSON.").with_report(
                    ErrorReport::from_message(
                        "infra::http::validate",
                        rejection.status(),
                        rejection.body_text(),
                    ),
                )
            })?;
        Ok(Self(value))
    }
}

fn field_id(field: &str) -> String {
    field.to_lowercase().replace(' ', "-")
}

fn field_label(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Non-empty and at most [`MAX_STRING_CHARS`] characters.
pub fn validate_text<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    let Some(text) = value else {
        return Err(not_a_string(field));
    };
    if text.is_empty() {
        return Err(ApiError::validation(
            format!("empty-{}", field_id(field)),
            format!("{} is empty.", field_label(field)),
        ));
    }
    if text.chars().count() > MAX_STRING_CHARS {
        return Err(ApiError::validation(
            format!("{}-too-long", field_id(field)),
            format!("{} is too long.", field_label(field)),
        ));
    }
    Ok(text)
}

pub fn validate_string<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a str, ApiError> {
    match value {
        Some(Value::String(text)) => validate_text(Some(text), field),
        _ => Err(not_a_string(field)),
    }
}

pub fn validate_boolean(value: Option<&Value>, field: &str) -> Result<bool, ApiError> {
    match value {
        Some(Value::Bool(flag)) => Ok(*flag),
        _ => Err(ApiError::validation(
            format!("{}-not-a-boolean", field_id(field)),
            format!("{} is not a boolean.", field_label(field)),
        )),
    }
}

fn not_a_string(field: &str) -> ApiError {
    ApiError::validation(
        format!("{}-not-a-string", field_id(field)),
        format!("{} is not a string.", field_label(field)),
    )
}
