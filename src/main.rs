use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use filevault::{
    AppState, BlobStore, Config, Database, JobQueue, ThumbnailJob, WebServer, WelcomeJob,
    WorkerPool,
};

#[tokio::main]
async fn main() {
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    if let Err(e) = filevault::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        filevault::logging::init_console_only(&config.logging.level);
    }

    info!("FileVault starting");

    if let Err(e) = run(config).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> filevault::Result<()> {
    let db = Arc::new(
        Database::open_with_max_connections(&config.database.path, config.database.max_connections)
            .await?,
    );
    let storage = BlobStore::new(&config.files.storage_path)?;
    info!("Blob storage at {}", config.files.storage_path);

    let queue = JobQueue::new(db.pool().clone())
        .with_max_attempts(config.jobs.max_attempts)
        .with_retry_delay(config.jobs.retry_delay_secs);

    let workers = WorkerPool::new(
        queue.clone(),
        config.jobs.concurrency,
        Duration::from_millis(config.jobs.poll_interval_ms),
    )
    .register(ThumbnailJob::new(Arc::clone(&db), storage.clone()))
    .register(WelcomeJob::new(Arc::clone(&db)));
    let worker_handle = tokio::spawn(workers.run());

    let state = AppState::new(Arc::clone(&db), storage, queue)
        .with_session_ttl(config.session.ttl_secs)
        .with_max_upload_bytes(config.files.max_upload_bytes());

    let server = WebServer::new(&config.server, state)?
        .with_cleanup_interval(Duration::from_secs(config.session.cleanup_interval_secs));
    let result = server.run().await;

    worker_handle.abort();
    db.close().await;
    info!("FileVault stopped");

    result
}
