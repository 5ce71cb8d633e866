//! Background worker pool draining the job queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::Result;

use super::queue::{Job, JobQueue, JobStatus};

/// Processes the jobs of one queue.
///
/// Delivery is at-least-once, so `handle` must be idempotent. Returning
/// [`crate::VaultError::JobFatal`] dead-letters the job; any other error lets the
/// queue redeliver it.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Name of the queue this handler consumes.
    fn queue(&self) -> &'static str;

    async fn handle(&self, payload: &Value) -> Result<()>;
}

/// Polls every registered queue and runs claimed jobs with bounded concurrency.
pub struct WorkerPool {
    queue: JobQueue,
    handlers: Vec<Arc<dyn JobHandler>>,
    concurrency: usize,
    poll_interval: Duration,
    permits: Arc<Semaphore>,
    /// Index of the handler polled next.
    cursor: AtomicUsize,
}

impl WorkerPool {
    pub fn new(queue: JobQueue, concurrency: usize, poll_interval: Duration) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            queue,
            handlers: Vec::new(),
            concurrency,
            poll_interval,
            permits: Arc::new(Semaphore::new(concurrency)),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Add a handler for its queue.
    pub fn register(mut self, handler: impl JobHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Run forever: requeue jobs left `running` by a previous process, then
    /// fill free permits on every tick without waiting for running jobs.
    pub async fn run(self) {
        info!(
            concurrency = self.concurrency,
            queues = ?self.handlers.iter().map(|h| h.queue()).collect::<Vec<_>>(),
            "Starting job workers"
        );

        match self.queue.recover_stale().await {
            Ok(0) => {}
            Ok(n) => info!("Requeued {} interrupted jobs", n),
            Err(e) => error!("Failed to requeue interrupted jobs: {}", e),
        }

        let mut tasks = JoinSet::new();
        let mut ticker = interval(self.poll_interval);
        loop {
            ticker.tick().await;

            while let Some(joined) = tasks.try_join_next() {
                log_panic(joined);
            }

            if let Err(e) = self.claim_available(&mut tasks).await {
                error!("Error claiming jobs: {}", e);
            }
        }
    }

    /// Process jobs until none is ready and none is running.
    ///
    /// Returns the number of jobs processed.
    pub async fn run_once(&self) -> Result<usize> {
        let mut tasks = JoinSet::new();
        let mut processed = 0;

        loop {
            match self.claim_available(&mut tasks).await {
                Ok(claimed) => processed += claimed,
                Err(e) => {
                    // Dropping the set would abort jobs mid-run.
                    while let Some(joined) = tasks.join_next().await {
                        log_panic(joined);
                    }
                    return Err(e);
                }
            }

            match tasks.join_next().await {
                Some(joined) => log_panic(joined),
                None => break,
            }
        }

        if processed > 0 {
            debug!("Processed {} jobs", processed);
        }
        Ok(processed)
    }

    /// Claim ready jobs into `tasks` while permits are free, one queue at a
    /// time in rotation. Stops once every queue came up empty in a row.
    async fn claim_available(&self, tasks: &mut JoinSet<JobStatus>) -> Result<usize> {
        let mut claimed = 0;
        let mut empty = 0;

        while empty < self.handlers.len() {
            let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                break;
            };

            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.handlers.len();
            let handler = &self.handlers[index];

            let Some(job) = self.queue.claim_next(handler.queue()).await? else {
                empty += 1;
                continue;
            };
            empty = 0;
            claimed += 1;

            let queue = self.queue.clone();
            let handler = Arc::clone(handler);
            tasks.spawn(async move {
                let _permit = permit;
                execute(&queue, handler.as_ref(), job).await
            });
        }

        Ok(claimed)
    }
}

fn log_panic(joined: std::result::Result<JobStatus, JoinError>) {
    if let Err(e) = joined {
        error!("Job task panicked: {}", e);
    }
}

/// Run one claimed job and record the outcome.
async fn execute(queue: &JobQueue, handler: &dyn JobHandler, job: Job) -> JobStatus {
    debug!(job_id = job.id, queue = %job.queue, attempt = job.attempts, "Running job");

    let outcome = match job.payload_json() {
        Ok(payload) => handler.handle(&payload).await,
        Err(e) => Err(e),
    };

    let recorded = match &outcome {
        Ok(()) => queue.complete(job.id).await.map(|_| JobStatus::Completed),
        Err(e) => queue.fail(job.id, &e.to_string(), e.is_fatal()).await,
    };

    match (outcome, recorded) {
        (Ok(()), Ok(status)) => {
            debug!(job_id = job.id, "Job completed");
            status
        }
        (Err(e), Ok(status)) => {
            warn!(job_id = job.id, queue = %job.queue, status = %status, "Job failed: {}", e);
            status
        }
        (_, Err(e)) => {
            // Left `running`; recovered on the next start.
            error!(job_id = job.id, "Failed to record job outcome: {}", e);
            JobStatus::Running
        }
    }
}
