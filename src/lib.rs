//! FileVault - token-authenticated file storage
//!
//! Users upload files and folders over a JSON API, keep them private or
//! publish them, and get image thumbnails generated by background workers.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod jobs;
pub mod logging;
pub mod web;

pub use auth::{
    hash_password, register, validate_password, verify_password, PasswordError,
    RegistrationRequest, SessionManager,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{Result, VaultError};
pub use file::{BlobStore, EntryType, FileEntry, FileService, FileView, UploadRequest};
pub use jobs::{JobHandler, JobQueue, ThumbnailJob, WelcomeJob, WorkerPool};
pub use web::{AppState, WebServer};
