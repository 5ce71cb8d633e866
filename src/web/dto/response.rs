//! Response DTOs for the HTTP API.
//!
//! File entries are returned as [`crate::file::FileView`] directly.

use serde::Serialize;

use crate::db::User;

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// `GET /connect` response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `GET /status` response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub db: bool,
    pub queue: bool,
}

/// `GET /stats` response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub files: i64,
}
