//! Session handlers.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::web::dto::TokenResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::token_from_headers;

/// GET /connect - Exchange Basic credentials for a session token.
pub async fn get_connect(
    State(state): State<Arc<AppState>>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let TypedHeader(Authorization(basic)) = credentials.ok_or_else(ApiError::unauthorized)?;

    let token = state
        .sessions()
        .login(basic.username(), basic.password())
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// GET /disconnect - Revoke the session token.
pub async fn get_disconnect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = token_from_headers(&headers).ok_or_else(ApiError::unauthorized)?;
    state.sessions().logout(token).await?;
    Ok(StatusCode::NO_CONTENT)
}
