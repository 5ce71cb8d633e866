//! Welcome notification sent after registration.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::db::{Database, UserRepository};
use crate::{Result, VaultError};

use super::payload_id;
use super::worker::JobHandler;

/// Queue consumed by [`WelcomeJob`].
pub const WELCOME_QUEUE: &str = "welcome";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomePayload {
    pub user_id: i64,
}

pub struct WelcomeJob {
    db: Arc<Database>,
}

impl WelcomeJob {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobHandler for WelcomeJob {
    fn queue(&self) -> &'static str {
        WELCOME_QUEUE
    }

    async fn handle(&self, payload: &Value) -> Result<()> {
        let user_id = payload_id(payload, "userId")
            .ok_or_else(|| VaultError::JobFatal("Missing userId".to_string()))?;

        let user = UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| VaultError::JobFatal("User not found".to_string()))?;

        info!("Welcome {}!", user.email);
        Ok(())
    }
}
