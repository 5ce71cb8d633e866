//! File management module for FileVault.
//!
//! - File and folder entries with owner/public visibility
//! - Blob storage with UUID naming
//! - The upload, lookup, listing and content-read service

mod entry;
mod service;
mod storage;

pub use entry::{
    parse_id, EntryType, FileEntry, FileEntryRepository, FileView, NewEntry, ROOT_PARENT_ID,
};
pub use service::{FileContents, FileService, UploadRequest};
pub use storage::{decode_base64, BlobStore};

/// Entries per listing page.
pub const PAGE_SIZE: i64 = 20;

/// Thumbnail widths generated for every upload, in generation order.
pub const THUMBNAIL_WIDTHS: [u32; 3] = [250, 500, 100];

/// Maximum entry name length (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Default maximum decoded upload size (10MB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
