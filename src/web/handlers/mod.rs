//! API handlers.

pub mod app;
pub mod auth;
pub mod files;
pub mod users;

pub use app::*;
pub use auth::*;
pub use files::*;
pub use users::*;

use std::sync::Arc;

use crate::auth::{SessionManager, DEFAULT_SESSION_DURATION_SECS};
use crate::db::Database;
use crate::file::{BlobStore, FileService, DEFAULT_MAX_FILE_SIZE};
use crate::jobs::JobQueue;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: BlobStore,
    pub queue: JobQueue,
    /// Lifetime of tokens issued by `/connect`.
    pub session_ttl_secs: u64,
    /// Largest accepted decoded upload.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db: Arc<Database>, storage: BlobStore, queue: JobQueue) -> Self {
        Self {
            db,
            storage,
            queue,
            session_ttl_secs: DEFAULT_SESSION_DURATION_SECS,
            max_upload_bytes: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_session_ttl(mut self, ttl_secs: u64) -> Self {
        self.session_ttl_secs = ttl_secs;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_bytes: usize) -> Self {
        self.max_upload_bytes = max_bytes;
        self
    }

    pub fn sessions(&self) -> SessionManager<'_> {
        SessionManager::new(self.db.pool()).with_ttl(self.session_ttl_secs)
    }

    pub fn files(&self) -> FileService<'_> {
        FileService::new(&self.db, &self.storage, &self.queue)
            .with_max_file_size(self.max_upload_bytes)
    }
}
