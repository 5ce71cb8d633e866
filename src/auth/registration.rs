//! User registration for FileVault.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::hash_password;
use crate::db::{NewUser, User, UserRepository};
use crate::jobs::{JobQueue, WelcomePayload, WELCOME_QUEUE};
use crate::{Result, VaultError};

/// Registration request data. Both fields are optional so that absence can be
/// reported with a precise message.
#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegistrationRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }
}

/// Register a new user.
///
/// 1. Requires a non-empty email and password
/// 2. Rejects an email that is already registered
/// 3. Stores the Argon2 hash of the password
/// 4. Enqueues the welcome job; an enqueue failure is logged only
pub async fn register(
    pool: &SqlitePool,
    queue: &JobQueue,
    request: RegistrationRequest,
) -> Result<User> {
    let email = match request.email.as_deref() {
        Some(email) if !email.is_empty() => email,
        _ => return Err(VaultError::Validation("Missing email".to_string())),
    };
    let password = match request.password.as_deref() {
        Some(password) if !password.is_empty() => password,
        _ => return Err(VaultError::Validation("Missing password".to_string())),
    };

    let repo = UserRepository::new(pool);
    if repo.get_by_email(email).await?.is_some() {
        return Err(VaultError::Validation("Already exist".to_string()));
    }

    let password_hash = hash_password(password)?;
    let user = repo.create(&NewUser::new(email, password_hash)).await?;
    info!(user_id = user.id, "Registered new user");

    if let Err(e) = queue
        .enqueue(WELCOME_QUEUE, &WelcomePayload { user_id: user.id })
        .await
    {
        warn!(user_id = user.id, error = %e, "Failed to enqueue welcome job");
    }

    Ok(user)
}
