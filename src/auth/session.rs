//! Session management: credential login, token resolution and logout.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::auth::verify_password;
use crate::db::{SessionRepository, User, UserRepository};
use crate::{Result, VaultError};

/// Default session duration (24 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 24 * 60 * 60;

/// Issues and checks session tokens against the database.
pub struct SessionManager<'a> {
    pool: &'a SqlitePool,
    ttl_secs: u64,
}

impl<'a> SessionManager<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            ttl_secs: DEFAULT_SESSION_DURATION_SECS,
        }
    }

    /// Override the token lifetime.
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Exchange credentials for a fresh token.
    ///
    /// Unknown email and wrong password are both `Unauthorized`.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let user = UserRepository::new(self.pool)
            .get_by_email(email)
            .await?
            .ok_or(VaultError::Unauthorized)?;

        if verify_password(password, &user.password).is_err() {
            debug!(user_id = user.id, "Rejected login with wrong password");
            return Err(VaultError::Unauthorized);
        }

        let session = SessionRepository::new(self.pool)
            .issue(user.id, self.ttl_secs)
            .await?;
        info!(user_id = user.id, "User connected");

        Ok(session.token)
    }

    /// Resolve a token to its user.
    pub async fn resolve(&self, token: &str) -> Result<User> {
        let user_id = SessionRepository::new(self.pool)
            .validate(token)
            .await?
            .ok_or(VaultError::Unauthorized)?;

        UserRepository::new(self.pool)
            .get_by_id(user_id)
            .await?
            .ok_or(VaultError::Unauthorized)
    }

    /// Revoke a token. Unknown or already revoked tokens are `Unauthorized`.
    pub async fn logout(&self, token: &str) -> Result<()> {
        if !SessionRepository::new(self.pool).revoke(token).await? {
            return Err(VaultError::Unauthorized);
        }
        info!("User disconnected");
        Ok(())
    }
}
