//! Session token extraction.
//!
//! Clients send the token issued by `/connect` in the `X-Token` header.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::db::User;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::VaultError;

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-token";

/// Read a non-empty session token from the request headers.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for authenticated users. Rejects with 401 when the token is
/// missing, unknown, expired or revoked.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        let user = state.sessions().resolve(token).await?;
        Ok(AuthUser(user))
    }
}

/// Extractor for routes that also serve anonymous requests.
///
/// A missing or invalid token yields `None` instead of a rejection.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_headers(&parts.headers) else {
            return Ok(OptionalAuthUser(None));
        };
        match state.sessions().resolve(token).await {
            Ok(user) => Ok(OptionalAuthUser(Some(user))),
            Err(VaultError::Unauthorized) => Ok(OptionalAuthUser(None)),
            Err(e) => Err(e.into()),
        }
    }
}
