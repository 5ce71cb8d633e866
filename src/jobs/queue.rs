//! Durable job queue backed by the `jobs` table.
//!
//! Delivery is at-least-once: a job is claimed by flipping it to `running`,
//! and a worker that dies mid-job leaves it there until
//! [`JobQueue::recover_stale`] puts it back.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{Result, VaultError};

use super::DEFAULT_MAX_ATTEMPTS;

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    /// Dead-lettered: fatal error or out of attempts.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("unknown job status: {s}")),
        }
    }
}

impl TryFrom<String> for JobStatus {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// A queued unit of work.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub queue: String,
    /// JSON payload as stored.
    pub payload: String,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    /// Deliveries so far, including the current one.
    pub attempts: i64,
    pub max_attempts: i64,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Job {
    /// Parse the payload. Malformed JSON can never succeed, so it is fatal.
    pub fn payload_json(&self) -> Result<Value> {
        serde_json::from_str(&self.payload)
            .map_err(|e| VaultError::JobFatal(format!("Invalid payload: {e}")))
    }
}

const JOB_COLUMNS: &str =
    "id, queue, payload, status, attempts, max_attempts, last_error, created_at, updated_at";

/// Handle on the job table. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    pool: SqlitePool,
    max_attempts: i64,
    retry_delay_secs: u64,
}

impl JobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_secs: 0,
        }
    }

    /// Deliveries allowed per job before it is dead-lettered.
    pub fn with_max_attempts(mut self, max_attempts: i64) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Base backoff before a failed job becomes claimable again. The delay
    /// grows linearly with the attempt count.
    pub fn with_retry_delay(mut self, secs: u64) -> Self {
        self.retry_delay_secs = secs;
        self
    }

    /// Add a job to `queue`. Returns its ID.
    pub async fn enqueue<T: Serialize>(&self, queue: &str, payload: &T) -> Result<i64> {
        let payload = serde_json::to_string(payload)
            .map_err(|e| VaultError::Internal(format!("job payload: {e}")))?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO jobs (queue, payload, max_attempts) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(queue)
        .bind(payload)
        .bind(self.max_attempts)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(id)
    }

    /// Atomically move the oldest claimable job in `queue` to `running`.
    pub async fn claim_next(&self, queue: &str) -> Result<Option<Job>> {
        let sql = format!(
            "UPDATE jobs
             SET status = 'running', attempts = attempts + 1, updated_at = datetime('now')
             WHERE status = 'queued' AND id = (
                 SELECT id FROM jobs
                 WHERE queue = ? AND status = 'queued' AND available_at <= datetime('now')
                 ORDER BY id
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(queue)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(job)
    }

    pub async fn complete(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET status = 'completed', last_error = NULL, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(())
    }

    /// Record a failed delivery.
    ///
    /// Fatal errors and jobs out of attempts become `failed`; anything else
    /// goes back to `queued` after the backoff. Returns the new status.
    pub async fn fail(&self, id: i64, error: &str, fatal: bool) -> Result<JobStatus> {
        let status: String = sqlx::query_scalar(
            "UPDATE jobs
             SET status = CASE WHEN ? OR attempts >= max_attempts THEN 'failed' ELSE 'queued' END,
                 last_error = ?,
                 available_at = datetime('now', '+' || (? * attempts) || ' seconds'),
                 updated_at = datetime('now')
             WHERE id = ?
             RETURNING status",
        )
        .bind(fatal)
        .bind(error)
        .bind(self.retry_delay_secs as i64)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?
        .ok_or_else(|| VaultError::NotFound(format!("job {id}")))?;

        status.parse().map_err(VaultError::Database)
    }

    /// Requeue every `running` job. Called once when workers start, before
    /// anything is claimed.
    pub async fn recover_stale(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'queued', updated_at = datetime('now') WHERE status = 'running'",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?");
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(job)
    }

    /// Number of jobs in `queue` with `status`.
    pub async fn count(&self, queue: &str, status: JobStatus) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE queue = ? AND status = ?")
                .bind(queue)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(count)
    }

    /// Liveness probe: the job table is reachable.
    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs WHERE id = 0")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
