//! File and folder entries and their repository.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{Result, VaultError};

/// Parent ID of entries at the top of the hierarchy.
pub const ROOT_PARENT_ID: i64 = 0;

/// Coerce an external identifier to a store ID.
///
/// Returns `None` for anything that is not a non-negative integer, so callers
/// can treat malformed IDs exactly like absent ones.
pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id >= 0)
}

/// Kind of entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Folder,
    File,
    Image,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Folder => "folder",
            EntryType::File => "file",
            EntryType::Image => "image",
        }
    }

    /// Folders have no blob.
    pub fn is_folder(&self) -> bool {
        matches!(self, EntryType::Folder)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "folder" => Ok(EntryType::Folder),
            "file" => Ok(EntryType::File),
            "image" => Ok(EntryType::Image),
            _ => Err(format!("unknown entry type: {s}")),
        }
    }
}

impl TryFrom<String> for EntryType {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// A stored file or folder.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileEntry {
    pub id: i64,
    /// Owner. Never changes.
    pub user_id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub entry_type: EntryType,
    /// Containing folder, or [`ROOT_PARENT_ID`].
    pub parent_id: i64,
    pub is_public: bool,
    /// Blob location. Always `None` for folders.
    pub local_path: Option<String>,
    pub created_at: String,
}

impl FileEntry {
    /// Whether `requester` may see this entry.
    pub fn is_visible_to(&self, requester: Option<i64>) -> bool {
        self.is_public || requester == Some(self.user_id)
    }
}

/// The externally visible projection of an entry. Never carries the blob path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub is_public: bool,
    pub parent_id: i64,
}

impl From<&FileEntry> for FileView {
    fn from(entry: &FileEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            name: entry.name.clone(),
            entry_type: entry.entry_type,
            is_public: entry.is_public,
            parent_id: entry.parent_id,
        }
    }
}

impl From<FileEntry> for FileView {
    fn from(entry: FileEntry) -> Self {
        Self::from(&entry)
    }
}

/// Data for inserting an entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: i64,
    pub name: String,
    pub entry_type: EntryType,
    pub parent_id: i64,
    pub is_public: bool,
    pub local_path: Option<String>,
}

impl NewEntry {
    /// A private entry at the root.
    pub fn new(user_id: i64, name: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            user_id,
            name: name.into(),
            entry_type,
            parent_id: ROOT_PARENT_ID,
            is_public: false,
            local_path: None,
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn with_local_path(mut self, local_path: impl Into<String>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }
}

const SELECT_ENTRY: &str = "SELECT id, user_id, name, type AS entry_type, parent_id, is_public,
                                   local_path, created_at
                            FROM files";

/// Repository for file entries.
pub struct FileEntryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileEntryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an entry and return it with its assigned ID.
    pub async fn create(&self, entry: &NewEntry) -> Result<FileEntry> {
        let result = sqlx::query(
            "INSERT INTO files (user_id, name, type, parent_id, is_public, local_path)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(&entry.name)
        .bind(entry.entry_type.as_str())
        .bind(entry.parent_id)
        .bind(entry.is_public)
        .bind(&entry.local_path)
        .execute(self.pool)
        .await
        .map_err(|e| VaultError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| VaultError::NotFound("file".to_string()))
    }

    /// Get an entry by ID regardless of owner.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE id = ?");
        let entry = sqlx::query_as::<_, FileEntry>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(entry)
    }

    /// Get an entry only if `user_id` owns it.
    pub async fn get_owned(&self, id: i64, user_id: i64) -> Result<Option<FileEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE id = ? AND user_id = ?");
        let entry = sqlx::query_as::<_, FileEntry>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(entry)
    }

    /// One page of `user_id`'s entries under `parent_id`, newest first.
    pub async fn list_by_parent(
        &self,
        user_id: i64,
        parent_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<FileEntry>> {
        let sql = format!(
            "{SELECT_ENTRY} WHERE user_id = ? AND parent_id = ? ORDER BY id DESC LIMIT ? OFFSET ?"
        );
        let entries = sqlx::query_as::<_, FileEntry>(&sql)
            .bind(user_id)
            .bind(parent_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(entries)
    }

    /// Set the visibility of an entry owned by `user_id`.
    ///
    /// Returns the updated entry, or `None` when no entry matches both the ID
    /// and the owner.
    pub async fn set_public(
        &self,
        id: i64,
        user_id: i64,
        is_public: bool,
    ) -> Result<Option<FileEntry>> {
        let result = sqlx::query("UPDATE files SET is_public = ? WHERE id = ? AND user_id = ?")
            .bind(is_public)
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Total number of entries.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await
            .map_err(|e| VaultError::Database(e.to_string()))?;

        Ok(count)
    }
}
