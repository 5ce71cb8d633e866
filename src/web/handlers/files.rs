//! File handlers for the HTTP API.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::file::FileView;
use crate::VaultError;
use crate::web::dto::{CreateFileRequest, FileDataQuery, ListFilesQuery, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, OptionalAuthUser};

/// POST /files - Create a folder or upload a file.
pub async fn post_upload(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFileRequest>,
) -> Result<(StatusCode, Json<FileView>), ApiError> {
    // An unknown parent is a 400 on upload.
    let view = state
        .files()
        .create_entry(user.id, &req.into())
        .await
        .map_err(|e| match e {
            VaultError::NotFound(msg) => ApiError::bad_request(msg),
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /files/:id - One entry visible to the caller.
pub async fn get_show(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileView>, ApiError> {
    let view = state.files().get_entry(user.id, &id).await?;
    Ok(Json(view))
}

/// GET /files - The caller's entries under `parentId`, 20 per page.
pub async fn get_index(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileView>>, ApiError> {
    let entries = state
        .files()
        .list_entries(user.id, query.parent_id.as_deref(), query.page())
        .await?;
    Ok(Json(entries))
}

/// PUT /files/:id/publish
pub async fn put_publish(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileView>, ApiError> {
    let view = state.files().set_visibility(user.id, &id, true).await?;
    Ok(Json(view))
}

/// PUT /files/:id/unpublish
pub async fn put_unpublish(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileView>, ApiError> {
    let view = state.files().set_visibility(user.id, &id, false).await?;
    Ok(Json(view))
}

/// GET /files/:id/data - Raw content, or a thumbnail with `?size=`.
///
/// Public entries need no token.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    Path(id): Path<String>,
    Query(query): Query<FileDataQuery>,
) -> Result<Response, ApiError> {
    let contents = state
        .files()
        .read_contents(user.map(|u| u.id), &id, query.size.as_deref())
        .await?;

    Ok(([(header::CONTENT_TYPE, contents.content_type)], contents.bytes).into_response())
}
