//! Test helpers for HTTP API tests.
//!
//! Builds the router over an in-memory database and a temporary blob
//! directory, and wraps the register/connect dance.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tempfile::TempDir;

use filevault::file::BlobStore;
use filevault::jobs::{JobQueue, ThumbnailJob, WelcomeJob, WorkerPool};
use filevault::web::create_router;
use filevault::{AppState, Database};

/// Session token header.
pub const X_TOKEN: &str = "x-token";

/// A running test API plus handles on its stores.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    /// Keeps the blob directory alive for the test.
    pub blob_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let blob_dir = TempDir::new().expect("Failed to create blob directory");
        let storage = BlobStore::new(blob_dir.path()).expect("Failed to create blob store");
        let queue = JobQueue::new(db.pool().clone()).with_retry_delay(0);

        let state = Arc::new(AppState::new(Arc::new(db), storage, queue));
        let router = create_router(state.clone(), &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            blob_dir,
        }
    }

    /// Worker pool over this app's queue with both job handlers registered.
    pub fn workers(&self) -> WorkerPool {
        WorkerPool::new(self.state.queue.clone(), 2, Duration::from_millis(10))
            .register(ThumbnailJob::new(
                self.state.db.clone(),
                self.state.storage.clone(),
            ))
            .register(WelcomeJob::new(self.state.db.clone()))
    }

    /// Register a user and return the response body.
    pub async fn register(&self, email: &str, password: &str) -> Value {
        let response = self
            .server
            .post("/users")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }

    /// Exchange credentials for a session token.
    pub async fn connect(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .get("/connect")
            .add_header(AUTHORIZATION, basic_auth(email, password))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }

    /// Register and connect in one go.
    pub async fn login(&self, email: &str, password: &str) -> String {
        self.register(email, password).await;
        self.connect(email, password).await
    }

    /// Create an entry through the API and return the response body.
    pub async fn upload(&self, token: &str, body: Value) -> Value {
        let response = self
            .server
            .post("/files")
            .add_header(X_TOKEN, token.to_string())
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()
    }
}

/// `Authorization: Basic` value for the given credentials.
pub fn basic_auth(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
}

/// A small solid-colour PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
