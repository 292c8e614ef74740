mod support;

use axum::http::{HeaderValue, StatusCode, header};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::json;

use support::{
    MAX_UPLOAD_BYTES, TestApp, app, empty_request, json_request, raw_request, read_bytes,
    read_json,
};

async fn upload(app: &TestApp, cookie: &str, id: &str, name: &str, data: &[u8]) -> StatusCode {
    let body = format!("data:text/plain;base64,{}", STANDARD.encode(data));
    let response = app
        .send(raw_request(
            "PUT",
            &format!("/posts/{id}/{name}"),
            Some(cookie),
            body,
        ))
        .await;
    response.status()
}

#[tokio::test]
async fn uploaded_files_download_with_caching_headers() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    let response = app
        .send(raw_request(
            "PUT",
            &format!("/posts/{id}/notes.txt"),
            Some(&cookie),
            STANDARD.encode("hello, folio"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({ "message": "File was uploaded." })
    );

    let response = app
        .send(empty_request("GET", &format!("/posts/{id}/notes.txt"), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(
        headers.get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static("text/plain"))
    );
    assert_eq!(
        headers.get(header::CACHE_CONTROL),
        Some(&HeaderValue::from_static("public, max-age=604800"))
    );
    assert_eq!(
        headers.get(header::CONTENT_LENGTH),
        Some(&HeaderValue::from(12u64))
    );
    let etag = headers.get(header::ETAG).expect("etag").clone();
    assert!(etag.to_str().expect("ascii etag").starts_with('"'));
    assert_eq!(&read_bytes(response).await[..], b"hello, folio");

    let request = axum::http::Request::builder()
        .method("GET")
        .uri(format!("/posts/{id}/notes.txt"))
        .header(header::IF_NONE_MATCH, etag.clone())
        .body(axum::body::Body::empty())
        .expect("request");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(response.headers().get(header::ETAG), Some(&etag));
    assert!(read_bytes(response).await.is_empty());
}

#[tokio::test]
async fn uploading_overwrites_the_previous_content() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    assert_eq!(upload(&app, &cookie, &id, "a.txt", b"first").await, StatusCode::OK);
    assert_eq!(upload(&app, &cookie, &id, "a.txt", b"second").await, StatusCode::OK);

    let response = app
        .send(empty_request("GET", &format!("/posts/{id}/a.txt"), None))
        .await;
    assert_eq!(&read_bytes(response).await[..], b"second");
}

#[tokio::test]
async fn file_mutations_require_a_session() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    let response = app
        .send(raw_request(
            "PUT",
            &format!("/posts/{id}/x.txt"),
            None,
            STANDARD.encode("x"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(empty_request(
            "DELETE",
            &format!("/posts/{id}/cover"),
            Some("session=forged"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.attachments.list(&id).await.expect("list").len(), 1);
}

#[tokio::test]
async fn invalid_base64_is_rejected() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    let response = app
        .send(raw_request(
            "PUT",
            &format!("/posts/{id}/broken.bin"),
            Some(&cookie),
            "data:application/octet-stream;base64,!!!",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid-file-data");
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    let response = app
        .send(raw_request(
            "PUT",
            &format!("/posts/{id}/huge.bin"),
            Some(&cookie),
            "A".repeat(MAX_UPLOAD_BYTES + 4),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(read_json(response).await["error"], "file-too-large");
}

#[tokio::test]
async fn renaming_moves_the_file() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;
    upload(&app, &cookie, &id, "draft.md", b"# draft").await;

    let response = app
        .send(json_request(
            "POST",
            &format!("/posts/{id}/draft.md"),
            Some(&cookie),
            json!({ "name": "final.md" }),
        ))
        .await;
    assert_eq!(
        read_json(response).await,
        json!({ "message": "File was renamed." })
    );

    let response = app
        .send(empty_request("GET", &format!("/posts/{id}/draft.md"), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app
        .send(empty_request("GET", &format!("/posts/{id}/final.md"), None))
        .await;
    assert_eq!(&read_bytes(response).await[..], b"# draft");
}

#[tokio::test]
async fn renaming_validates_the_new_name() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    let response = app
        .send(json_request(
            "POST",
            &format!("/posts/{id}/cover"),
            Some(&cookie),
            json!({ "name": 7 }),
        ))
        .await;
    assert_eq!(read_json(response).await["error"], "new-file-name-not-a-string");

    let response = app
        .send(json_request(
            "POST",
            &format!("/posts/{id}/cover"),
            Some(&cookie),
            json!({ "name": "../escape" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "invalid-file-name");
}

#[tokio::test]
async fn missing_files_are_not_found() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    let response = app
        .send(empty_request("GET", &format!("/posts/{id}/nope.png"), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"], "file-not-found");

    let response = app
        .send(json_request(
            "POST",
            &format!("/posts/{id}/nope.png"),
            Some(&cookie),
            json!({ "name": "still-nope.png" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(empty_request(
            "DELETE",
            &format!("/posts/{id}/nope.png"),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_file() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    let response = app
        .send(empty_request(
            "DELETE",
            &format!("/posts/{id}/cover"),
            Some(&cookie),
        ))
        .await;
    assert_eq!(
        read_json(response).await,
        json!({ "message": "File was deleted." })
    );
    assert!(app.attachments.list(&id).await.expect("list").is_empty());
}

#[tokio::test]
async fn stale_validators_get_the_full_content() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;
    upload(&app, &cookie, &id, "notes.txt", b"fresh").await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri(format!("/posts/{id}/notes.txt"))
        .header(header::IF_NONE_MATCH, "\"stale\"")
        .body(axum::body::Body::empty())
        .expect("request");
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let etag = response
        .headers()
        .get(header::ETAG)
        .and_then(|value| value.to_str().ok())
        .expect("etag")
        .to_string();
    assert_ne!(etag, "\"stale\"");
    assert_eq!(&read_bytes(response).await[..], b"fresh");
}

#[tokio::test]
async fn post_ids_with_separators_are_rejected() {
    let app = app().await;
    let cookie = app.sign_in().await;
    let id = app.create_post(&cookie).await;

    for path in [
        format!("/posts/{id}%2Fsub/x.txt"),
        "/posts/..%2Fx/y".to_string(),
    ] {
        let response = app
            .send(raw_request("PUT", &path, Some(&cookie), STANDARD.encode("x")))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(read_json(response).await["error"], "invalid-post-id");

        let response = app.send(empty_request("GET", &path, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
    }

    let names: Vec<String> = app
        .attachments
        .list(&id)
        .await
        .expect("list")
        .into_iter()
        .map(|attachment| attachment.name)
        .collect();
    assert_eq!(names, vec!["cover".to_string()]);
}
