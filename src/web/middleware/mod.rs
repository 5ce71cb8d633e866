//! Middleware and extractors for the HTTP API.

pub mod auth;
pub mod cors;

pub use auth::{token_from_headers, AuthUser, OptionalAuthUser, TOKEN_HEADER};
pub use cors::create_cors_layer;
