//! Background jobs for FileVault.
//!
//! A durable SQLite-backed queue, a polling worker pool, and the two job
//! handlers: thumbnail generation and the welcome notification.

mod queue;
mod thumbnail;
mod welcome;
mod worker;

pub use queue::{Job, JobQueue, JobStatus};
pub use thumbnail::{render_thumbnail, ThumbnailJob, ThumbnailPayload, THUMBNAIL_QUEUE};
pub use welcome::{WelcomeJob, WelcomePayload, WELCOME_QUEUE};
pub use worker::{JobHandler, WorkerPool};

use serde_json::Value;

use crate::file::parse_id;

/// Default deliveries per job before it is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: i64 = 3;

/// Read an ID field from a job payload. Numbers and numeric strings are
/// accepted; anything else counts as missing.
fn payload_id(payload: &Value, key: &str) -> Option<i64> {
    match payload.get(key)? {
        Value::Number(n) => n.as_i64().filter(|id| *id >= 0),
        Value::String(s) => parse_id(s),
        _ => None,
    }
}
