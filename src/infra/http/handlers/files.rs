use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State, rejection::BytesRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::application::attachments::Download;
use crate::infra::http::{
    error::ApiError,
    session::require_session,
    state::HttpState,
    validate::{JsonBody, validate_string, validate_text},
};

use super::MessageResponse;

const CACHE_CONTROL_VALUE: &str = "public, max-age=604800";

pub async fn download_file(
    State(state): State<HttpState>,
    Path((id, file)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = validate_text(Some(&id), "post ID")?;
    let file = validate_text(Some(&file), "file name")?;
    let if_none_match = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());

    match state.attachments.download(id, file, if_none_match).await? {
        Download::NotModified { etag } => {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(CACHE_CONTROL_VALUE),
            );
            if let Ok(value) = HeaderValue::from_str(&etag) {
                headers.insert(header::ETAG, value);
            }
            Ok(response)
        }
        Download::Content { etag, size, stream } => {
            let mime = mime_guess::from_path(file).first_or_octet_stream();
            let mut response = Body::from_stream(stream).into_response();
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(CACHE_CONTROL_VALUE),
            );
            if let Some(etag) = etag
                && let Ok(value) = HeaderValue::from_str(&etag)
            {
                headers.insert(header::ETAG, value);
            }
            Ok(response)
        }
    }
}

pub async fn upload_file(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path((id, file)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_session(&state, &jar).await?;
    let id = validate_text(Some(&id), "post ID")?;
    let file = validate_text(Some(&file), "file name")?;

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::file_too_large()
        } else {
            ApiError::bad_request("The request body could not be read.")
        }
    })?;
    let data = decode_upload(&body)?;

    state.attachments.upload(id, file, data).await?;
    Ok(Json(MessageResponse {
        message: "File was uploaded.",
    }))
}

pub async fn rename_file(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path((id, file)): Path<(String, String)>,
    body: Result<JsonBody, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_session(&state, &jar).await?;
    let id = validate_text(Some(&id), "post ID")?;
    let file = validate_text(Some(&file), "file name")?;
    let JsonBody(body) = body?;
    let new_name = validate_string(body.get("name"), "new file name")?;

    state.attachments.rename(id, file, new_name).await?;
    Ok(Json(MessageResponse {
        message: "File was renamed.",
    }))
}

pub async fn delete_file(
    State(state): State<HttpState>,
    jar: CookieJar,
    Path((id, file)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_session(&state, &jar).await?;
    let id = validate_text(Some(&id), "post ID")?;
    let file = validate_text(Some(&file), "file name")?;

    state.attachments.delete(id, file).await?;
    Ok(Json(MessageResponse {
        message: "File was deleted.",
    }))
}

/// Accepts a bare base64 body or a data URL; only the part after the first
/// comma is decoded.
fn decode_upload(body: &[u8]) -> Result<Bytes, ApiError> {
    let payload = match body.iter().position(|byte| *byte == b',') {
        Some(comma) => &body[comma + 1..],
        None => body,
    };
    STANDARD
        .decode(payload.trim_ascii())
        .map(Bytes::from)
        .map_err(|_| ApiError::invalid_file_data())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_and_bare_payloads_decode() {
        let bare = decode_upload(b"aGVsbG8=").expect("bare");
        assert_eq!(&bare[..], b"hello");

        let url = decode_upload(b"data:text/plain;base64,aGVsbG8=\n").expect("data url");
        assert_eq!(&url[..], b"hello");
    }

    #[test]
    fn garbage_is_invalid_file_data() {
        let err = decode_upload(b"data:image/png;base64,@@@").expect_err("not base64");
        assert_eq!(err.code(), "invalid-file-data");
    }
}
