//! Authentication module for FileVault.
//!
//! Password hashing, user registration and session tokens.

mod password;
mod registration;
mod session;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
};
pub use registration::{register, RegistrationRequest};
pub use session::{SessionManager, DEFAULT_SESSION_DURATION_SECS};
