//! Blob storage for FileVault.
//!
//! Raw upload bytes live under a base directory, one UUID-named file per
//! upload, sharded by the first two characters of the UUID:
//! ```text
//! {base_path}/
//! ├── ab/
//! │   ├── ab12cd34-5678-90ab-cdef-123456789012
//! │   ├── ab12cd34-5678-90ab-cdef-123456789012_250
//! │   ├── ab12cd34-5678-90ab-cdef-123456789012_500
//! │   └── ab12cd34-5678-90ab-cdef-123456789012_100
//! └── ...
//! ```
//! Thumbnails sit next to their original with a `_<width>` suffix.

use std::io;
use std::path::{Path, PathBuf};

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tokio::fs;
use uuid::Uuid;

use crate::{Result, VaultError};

/// Standard alphabet, padding optional.
const UPLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64 upload payload. Embedded whitespace is ignored.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    UPLOAD_ENGINE
        .decode(compact.as_bytes())
        .map_err(|_| VaultError::Validation("Invalid data".to_string()))
}

/// Handle on the blob directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `content` at a fresh unique path and return that path.
    pub async fn write(&self, content: &[u8]) -> Result<String> {
        let stored_name = Uuid::new_v4().to_string();
        let path = self.base_path.join(&stored_name[..2]).join(&stored_name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;

        Ok(path.to_string_lossy().into_owned())
    }

    /// Write `content` at `path`, replacing whatever was there.
    pub async fn write_at(&self, path: &str, content: &[u8]) -> Result<()> {
        fs::write(path, content).await?;
        Ok(())
    }

    /// Read a blob. A missing file is `NotFound`.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        match fs::read(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound("Not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a blob. Returns false if it did not exist.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Location of the `width` thumbnail for the blob at `path`.
    pub fn derivative_path(path: &str, width: u32) -> String {
        format!("{path}_{width}")
    }
}
