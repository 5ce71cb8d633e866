//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    get_connect, get_disconnect, get_file, get_index, get_me, get_show, get_stats, get_status,
    post_new, post_upload, put_publish, put_unpublish, AppState,
};
use super::middleware::create_cors_layer;

/// Extra room for the JSON envelope around a base64 payload.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Request body limit for a decoded upload limit of `max_upload_bytes`.
///
/// Base64 inflates content by 4/3.
pub fn body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(4)
        .div_ceil(3)
        .saturating_add(BODY_LIMIT_SLACK)
}

/// Create the API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let limit = body_limit(app_state.max_upload_bytes);

    let status_routes = Router::new()
        .route("/status", get(get_status))
        .route("/stats", get(get_stats));

    let auth_routes = Router::new()
        .route("/connect", get(get_connect))
        .route("/disconnect", get(get_disconnect))
        .route("/users", post(post_new))
        .route("/users/me", get(get_me));

    let file_routes = Router::new()
        .route("/files", post(post_upload).get(get_index))
        .route("/files/:id", get(get_show))
        .route("/files/:id/publish", put(put_publish))
        .route("/files/:id/unpublish", put(put_unpublish))
        .route("/files/:id/data", get(get_file));

    Router::new()
        .merge(status_routes)
        .merge(auth_routes)
        .merge(file_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(limit)),
        )
        .with_state(app_state)
}
