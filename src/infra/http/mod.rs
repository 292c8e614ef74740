//! Admin and read API: routing, session gate, validation and error rendering.

pub mod error;
mod handlers;
mod middleware;
mod rate_limit;
pub mod session;
mod state;
pub mod validate;

pub use error::ApiError;
pub use rate_limit::AttemptLimiter;
pub use state::HttpState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use self::handlers::{method_not_allowed, route_not_found};
use self::middleware::{log_responses, set_request_context, throttle_password_attempts};

/// Builds the full router. `max_upload_bytes` bounds the upload route body;
/// base64 overhead counts against it.
pub fn build_router(state: HttpState, max_upload_bytes: usize) -> Router {
    let password_routes = Router::new()
        .route(
            "/sign-in",
            post(handlers::sign_in).fallback(method_not_allowed),
        )
        .route(
            "/change-password",
            post(handlers::change_password).fallback(method_not_allowed),
        )
        .route_layer(from_fn_with_state(state.clone(), throttle_password_attempts));

    Router::new()
        .route(
            "/sign-out",
            post(handlers::sign_out).fallback(method_not_allowed),
        )
        .route(
            "/validate-session",
            get(handlers::validate_session).fallback(method_not_allowed),
        )
        .route(
            "/posts",
            get(handlers::list_posts)
                .post(handlers::create_post)
                .fallback(method_not_allowed),
        )
        .route(
            "/posts/{id}",
            get(handlers::get_post)
                .post(handlers::update_post)
                .delete(handlers::delete_post)
                .fallback(method_not_allowed),
        )
        .route(
            "/posts/{id}/{file}",
            get(handlers::download_file)
                .put(handlers::upload_file)
                .post(handlers::rename_file)
                .delete(handlers::delete_file)
                .fallback(method_not_allowed)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/featured",
            get(handlers::get_featured)
                .post(handlers::set_featured)
                .fallback(method_not_allowed),
        )
        .merge(password_routes)
        .fallback(route_not_found)
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}
