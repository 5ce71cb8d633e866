//! Session token repository.
//!
//! Tokens are opaque random strings mapped to a user until they expire or
//! are revoked.

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Result, VaultError};

const SQL_NOW: &str = "datetime('now')";

/// Longer lifetimes are clamped to a century.
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Session entity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    /// Expiration timestamp (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub expires_at: String,
    pub created_at: String,
    /// Revocation timestamp (None if not revoked).
    pub revoked_at: Option<String>,
}

/// New session for creation.
pub struct NewSession {
    pub user_id: i64,
    pub token: String,
    pub expires_at: String,
}

impl NewSession {
    /// A fresh random token for `user_id` valid for `ttl_secs`.
    pub fn generate(user_id: i64, ttl_secs: u64) -> Self {
        let ttl = Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64);
        let expires_at = (Utc::now() + ttl).format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            user_id,
            token: Uuid::new_v4().to_string(),
            expires_at,
        }
    }
}

/// Repository for session operations.
pub struct SessionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Store a session.
    pub async fn create(&self, new_session: &NewSession) -> Result<Session> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sessions (user_id, token, expires_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(new_session.user_id)
        .bind(&new_session.token)
        .bind(&new_session.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("session".to_string()))
    }

    /// Issue a new token for `user_id` valid for `ttl_secs`.
    pub async fn issue(&self, user_id: i64, ttl_secs: u64) -> Result<Session> {
        self.create(&NewSession::generate(user_id, ttl_secs)).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, token, expires_at, created_at, revoked_at
             FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(session)
    }

    /// Resolve a token to its user ID if it is neither expired nor revoked.
    pub async fn validate(&self, token: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT user_id FROM sessions
             WHERE token = ? AND revoked_at IS NULL AND expires_at > {SQL_NOW}"
        );
        let user_id = sqlx::query_scalar::<_, i64>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(user_id)
    }

    /// Revoke a live token. Returns false when it was unknown, expired or already revoked.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let sql = format!(
            "UPDATE sessions SET revoked_at = {SQL_NOW}
             WHERE token = ? AND revoked_at IS NULL AND expires_at > {SQL_NOW}"
        );
        let result = sqlx::query(&sql)
            .bind(token)
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired and revoked sessions.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let sql = format!(
            "DELETE FROM sessions WHERE expires_at <= {SQL_NOW} OR revoked_at IS NOT NULL"
        );
        let result = sqlx::query(&sql)
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
