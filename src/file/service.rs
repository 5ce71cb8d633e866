//! File service for FileVault.
//!
//! High-level operations on entries:
//! - Upload with validation, blob write and thumbnail enqueue
//! - Lookup and listing with owner/public visibility
//! - Publish/unpublish by the owner
//! - Content reads, including thumbnail derivatives

use tracing::{debug, info, warn};

use crate::db::Database;
use crate::jobs::{JobQueue, ThumbnailPayload, THUMBNAIL_QUEUE};
use crate::{Result, VaultError};

use super::entry::{
    parse_id, EntryType, FileEntry, FileEntryRepository, FileView, NewEntry, ROOT_PARENT_ID,
};
use super::storage::{decode_base64, BlobStore};
use super::{DEFAULT_MAX_FILE_SIZE, MAX_NAME_LENGTH, PAGE_SIZE, THUMBNAIL_WIDTHS};

/// Raw upload request. Fields stay optional so absence is reported precisely.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub name: Option<String>,
    /// One of `folder`, `file`, `image`.
    pub entry_type: Option<String>,
    /// Parent ID as received. Absent means the root.
    pub parent_id: Option<String>,
    pub is_public: bool,
    /// Base64 content. Required unless the entry is a folder.
    pub data: Option<String>,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            entry_type: Some(entry_type.into()),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// Bytes of an entry or one of its thumbnails.
#[derive(Debug)]
pub struct FileContents {
    pub name: String,
    /// MIME type guessed from the entry name.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn not_found() -> VaultError {
    VaultError::NotFound("Not found".to_string())
}

/// File service over the metadata store, blob store and job queue.
pub struct FileService<'a> {
    db: &'a Database,
    storage: &'a BlobStore,
    queue: &'a JobQueue,
    max_file_size: usize,
}

impl<'a> FileService<'a> {
    pub fn new(db: &'a Database, storage: &'a BlobStore, queue: &'a JobQueue) -> Self {
        Self {
            db,
            storage,
            queue,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Limit on decoded upload size in bytes.
    pub fn with_max_file_size(mut self, max_size: usize) -> Self {
        self.max_file_size = max_size;
        self
    }

    fn repo(&self) -> FileEntryRepository<'_> {
        FileEntryRepository::new(self.db.pool())
    }

    /// Create a folder or upload a file for `owner`.
    ///
    /// The blob is written before the metadata row so a stored entry never
    /// points at missing bytes. Every non-folder upload enqueues a thumbnail
    /// job; failing to enqueue is logged and does not fail the upload.
    pub async fn create_entry(&self, owner: i64, request: &UploadRequest) -> Result<FileView> {
        let name = match request.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(VaultError::Validation("Missing name".to_string())),
        };
        let entry_type = request
            .entry_type
            .as_deref()
            .and_then(|t| t.parse::<EntryType>().ok())
            .ok_or_else(|| VaultError::Validation("Missing type".to_string()))?;
        let data = match request.data.as_deref() {
            Some(data) if !data.is_empty() => Some(data),
            _ if entry_type.is_folder() => None,
            _ => return Err(VaultError::Validation("Missing data".to_string())),
        };
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(VaultError::Validation(format!(
                "Name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }

        let parent_id = self.resolve_parent(request.parent_id.as_deref()).await?;

        let mut new_entry = NewEntry::new(owner, name, entry_type)
            .with_parent(parent_id)
            .with_public(request.is_public);

        let Some(data) = data.filter(|_| !entry_type.is_folder()) else {
            let entry = self.repo().create(&new_entry).await?;
            info!(file_id = entry.id, owner, "Created folder");
            return Ok(FileView::from(entry));
        };

        let content = decode_base64(data)?;
        if content.len() > self.max_file_size {
            let max_mb = self.max_file_size / 1024 / 1024;
            return Err(VaultError::Validation(format!(
                "File too large (max {max_mb}MB)"
            )));
        }

        let local_path = self.storage.write(&content).await?;
        new_entry = new_entry.with_local_path(local_path.clone());

        let entry = match self.repo().create(&new_entry).await {
            Ok(entry) => entry,
            Err(e) => {
                // Nothing references the blob yet.
                if let Err(cleanup) = self.storage.delete(&local_path).await {
                    warn!(
                        path = %local_path,
                        error = %cleanup,
                        "Failed to remove orphaned blob"
                    );
                }
                return Err(e);
            }
        };
        info!(file_id = entry.id, owner, size = content.len(), "Stored upload");

        let payload = ThumbnailPayload {
            file_id: entry.id,
            user_id: owner,
        };
        if let Err(e) = self.queue.enqueue(THUMBNAIL_QUEUE, &payload).await {
            warn!(file_id = entry.id, error = %e, "Failed to enqueue thumbnail job");
        }

        Ok(FileView::from(entry))
    }

    /// Map a raw parent reference to a folder ID, checking that it exists.
    async fn resolve_parent(&self, raw: Option<&str>) -> Result<i64> {
        let Some(raw) = raw else {
            return Ok(ROOT_PARENT_ID);
        };
        let parent_id =
            parse_id(raw).ok_or_else(|| VaultError::NotFound("Parent not found".to_string()))?;
        if parent_id == ROOT_PARENT_ID {
            return Ok(ROOT_PARENT_ID);
        }

        let parent = self
            .repo()
            .get_by_id(parent_id)
            .await?
            .ok_or_else(|| VaultError::NotFound("Parent not found".to_string()))?;
        if !parent.entry_type.is_folder() {
            return Err(VaultError::Validation("Parent is not a folder".to_string()));
        }
        Ok(parent.id)
    }

    /// Look up an entry visible to `requester`.
    async fn visible_entry(&self, requester: Option<i64>, file_id: &str) -> Result<FileEntry> {
        let id = parse_id(file_id).ok_or_else(not_found)?;
        self.repo()
            .get_by_id(id)
            .await?
            .filter(|entry| entry.is_visible_to(requester))
            .ok_or_else(not_found)
    }

    /// Get one entry. Private entries of other users are `NotFound`.
    pub async fn get_entry(&self, requester: i64, file_id: &str) -> Result<FileView> {
        self.visible_entry(Some(requester), file_id)
            .await
            .map(FileView::from)
    }

    /// One page of the requester's own entries under `parent_id`, newest first.
    ///
    /// A malformed parent ID matches nothing.
    pub async fn list_entries(
        &self,
        requester: i64,
        parent_id: Option<&str>,
        page: u32,
    ) -> Result<Vec<FileView>> {
        let parent_id = match parent_id {
            None => ROOT_PARENT_ID,
            Some(raw) => match parse_id(raw) {
                Some(id) => id,
                None => return Ok(Vec::new()),
            },
        };
        let offset = i64::from(page) * PAGE_SIZE;

        let entries = self
            .repo()
            .list_by_parent(requester, parent_id, offset, PAGE_SIZE)
            .await?;
        Ok(entries.iter().map(FileView::from).collect())
    }

    /// Publish or unpublish an entry owned by `requester`.
    pub async fn set_visibility(
        &self,
        requester: i64,
        file_id: &str,
        is_public: bool,
    ) -> Result<FileView> {
        let id = parse_id(file_id).ok_or_else(not_found)?;
        let entry = self
            .repo()
            .set_public(id, requester, is_public)
            .await?
            .ok_or_else(not_found)?;

        debug!(file_id = id, is_public, "Changed visibility");
        Ok(FileView::from(entry))
    }

    /// Read the bytes of an entry, or of its `size` thumbnail.
    ///
    /// Public entries are readable without a session. Folders, forbidden
    /// entries and missing blobs are all `NotFound`.
    pub async fn read_contents(
        &self,
        requester: Option<i64>,
        file_id: &str,
        size: Option<&str>,
    ) -> Result<FileContents> {
        let entry = self.visible_entry(requester, file_id).await?;
        let local_path = match (&entry.entry_type, &entry.local_path) {
            (EntryType::Folder, _) | (_, None) => return Err(not_found()),
            (_, Some(path)) => path,
        };

        let path = match size {
            None => local_path.clone(),
            Some(raw) => {
                let width = raw
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|w| THUMBNAIL_WIDTHS.contains(w))
                    .ok_or_else(|| VaultError::Validation("Invalid size".to_string()))?;
                BlobStore::derivative_path(local_path, width)
            }
        };

        let bytes = self.storage.read(&path).await?;
        let content_type = mime_guess::from_path(&entry.name)
            .first_or_octet_stream()
            .to_string();

        Ok(FileContents {
            name: entry.name,
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::jobs::JobStatus;
    use tempfile::TempDir;

    // "Hello Webstack!\n"
    const HELLO_B64: &str = "SGVsbG8gV2Vic3RhY2shCg==";

    struct Fixture {
        db: Database,
        storage: BlobStore,
        queue: JobQueue,
        _dir: TempDir,
    }

    impl Fixture {
        fn service(&self) -> FileService<'_> {
            FileService::new(&self.db, &self.storage, &self.queue)
        }
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        users.create(&NewUser::new("a@b.com", "h")).await.unwrap();
        users.create(&NewUser::new("c@d.com", "h")).await.unwrap();

        let dir = TempDir::new().unwrap();
        let storage = BlobStore::new(dir.path()).unwrap();
        let queue = JobQueue::new(db.pool().clone());
        Fixture {
            db,
            storage,
            queue,
            _dir: dir,
        }
    }

    fn expect_validation(result: Result<FileView>, expected: &str) {
        match result {
            Err(VaultError::Validation(msg)) => assert_eq!(msg, expected),
            other => panic!("expected validation error {expected:?}, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_folder_has_no_blob_and_no_job() {
        let fx = setup().await;

        let view = fx
            .service()
            .create_entry(1, &UploadRequest::new("docs", "folder"))
            .await
            .unwrap();
        assert_eq!(view.entry_type, EntryType::Folder);
        assert_eq!(view.parent_id, 0);
        assert!(!view.is_public);

        let stored = FileEntryRepository::new(fx.db.pool())
            .get_by_id(view.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.local_path.is_none());
        assert!(fx.queue.claim_next(THUMBNAIL_QUEUE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_file_writes_blob_and_enqueues_thumbnail() {
        let fx = setup().await;

        let view = fx
            .service()
            .create_entry(1, &UploadRequest::new("hello.txt", "file").with_data(HELLO_B64))
            .await
            .unwrap();

        let stored = FileEntryRepository::new(fx.db.pool())
            .get_by_id(view.id)
            .await
            .unwrap()
            .unwrap();
        let path = stored.local_path.unwrap();
        assert_eq!(fx.storage.read(&path).await.unwrap(), b"Hello Webstack!\n");

        let job = fx.queue.claim_next(THUMBNAIL_QUEUE).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        let payload = job.payload_json().unwrap();
        assert_eq!(payload["fileId"], view.id);
        assert_eq!(payload["userId"], 1);
    }

    #[tokio::test]
    async fn test_create_failed_insert_removes_blob() {
        let fx = setup().await;

        // No user 999, so the insert violates the owner foreign key.
        let result = fx
            .service()
            .create_entry(999, &UploadRequest::new("hello.txt", "file").with_data(HELLO_B64))
            .await;
        assert!(matches!(result, Err(VaultError::Database(_))));

        let mut pending = vec![fx.storage.base_path().to_path_buf()];
        let mut blobs = 0;
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    blobs += 1;
                }
            }
        }
        assert_eq!(blobs, 0);
        assert_eq!(fx.queue.count(THUMBNAIL_QUEUE, JobStatus::Queued).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_validation_order() {
        let fx = setup().await;
        let service = fx.service();

        let mut request = UploadRequest::default();
        expect_validation(service.create_entry(1, &request).await, "Missing name");

        request.name = Some(String::new());
        expect_validation(service.create_entry(1, &request).await, "Missing name");

        request.name = Some("x".to_string());
        expect_validation(service.create_entry(1, &request).await, "Missing type");

        request.entry_type = Some("video".to_string());
        expect_validation(service.create_entry(1, &request).await, "Missing type");

        request.entry_type = Some("file".to_string());
        expect_validation(service.create_entry(1, &request).await, "Missing data");

        request.data = Some(String::new());
        expect_validation(service.create_entry(1, &request).await, "Missing data");

        request.data = Some("@@@".to_string());
        expect_validation(service.create_entry(1, &request).await, "Invalid data");

        assert_eq!(FileEntryRepository::new(fx.db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_upload() {
        let fx = setup().await;
        let service = fx.service().with_max_file_size(4);

        expect_validation(
            service
                .create_entry(1, &UploadRequest::new("big", "file").with_data(HELLO_B64))
                .await,
            "File too large (max 0MB)",
        );
    }

    #[tokio::test]
    async fn test_create_parent_checks() {
        let fx = setup().await;
        let service = fx.service();

        let missing = service
            .create_entry(1, &UploadRequest::new("x", "folder").with_parent("999"))
            .await;
        assert!(matches!(missing, Err(VaultError::NotFound(ref m)) if m == "Parent not found"));

        let malformed = service
            .create_entry(1, &UploadRequest::new("x", "folder").with_parent("abc"))
            .await;
        assert!(matches!(malformed, Err(VaultError::NotFound(ref m)) if m == "Parent not found"));

        let file = service
            .create_entry(1, &UploadRequest::new("f.txt", "file").with_data(HELLO_B64))
            .await
            .unwrap();
        expect_validation(
            service
                .create_entry(
                    1,
                    &UploadRequest::new("x", "folder").with_parent(file.id.to_string()),
                )
                .await,
            "Parent is not a folder",
        );

        let root = service
            .create_entry(1, &UploadRequest::new("x", "folder").with_parent("0"))
            .await
            .unwrap();
        assert_eq!(root.parent_id, 0);
    }

    #[tokio::test]
    async fn test_create_inside_folder() {
        let fx = setup().await;
        let service = fx.service();

        let docs = service
            .create_entry(1, &UploadRequest::new("docs", "folder"))
            .await
            .unwrap();
        let file = service
            .create_entry(
                1,
                &UploadRequest::new("x.png", "image")
                    .with_parent(docs.id.to_string())
                    .with_data(HELLO_B64),
            )
            .await
            .unwrap();
        assert_eq!(file.parent_id, docs.id);
    }

    #[tokio::test]
    async fn test_get_entry_visibility() {
        let fx = setup().await;
        let service = fx.service();

        let private = service
            .create_entry(1, &UploadRequest::new("p", "folder"))
            .await
            .unwrap();
        let public = service
            .create_entry(1, &UploadRequest::new("q", "folder").with_public(true))
            .await
            .unwrap();

        assert_eq!(service.get_entry(1, &private.id.to_string()).await.unwrap(), private);
        assert!(matches!(
            service.get_entry(2, &private.id.to_string()).await,
            Err(VaultError::NotFound(_))
        ));
        assert_eq!(service.get_entry(2, &public.id.to_string()).await.unwrap(), public);
        assert!(matches!(
            service.get_entry(1, "nope").await,
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            service.get_entry(1, "12345").await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_entries_pagination() {
        let fx = setup().await;
        let service = fx.service();

        for i in 0..25 {
            service
                .create_entry(1, &UploadRequest::new(format!("f{i}"), "folder"))
                .await
                .unwrap();
        }
        service
            .create_entry(2, &UploadRequest::new("theirs", "folder"))
            .await
            .unwrap();

        let page0 = service.list_entries(1, None, 0).await.unwrap();
        assert_eq!(page0.len(), 20);
        assert_eq!(page0[0].name, "f24");
        assert!(page0.iter().all(|v| v.user_id == 1));

        let page1 = service.list_entries(1, Some("0"), 1).await.unwrap();
        assert_eq!(page1.len(), 5);
        assert_eq!(page1[4].name, "f0");

        assert!(service.list_entries(1, None, 2).await.unwrap().is_empty());
        assert!(service.list_entries(1, Some("junk"), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_entries_by_parent() {
        let fx = setup().await;
        let service = fx.service();

        let docs = service
            .create_entry(1, &UploadRequest::new("docs", "folder"))
            .await
            .unwrap();
        service
            .create_entry(
                1,
                &UploadRequest::new("inner", "folder").with_parent(docs.id.to_string()),
            )
            .await
            .unwrap();

        let inside = service
            .list_entries(1, Some(&docs.id.to_string()), 0)
            .await
            .unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].name, "inner");

        // Another user's folder lists nothing for them.
        assert!(service
            .list_entries(2, Some(&docs.id.to_string()), 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_set_visibility() {
        let fx = setup().await;
        let service = fx.service();

        let entry = service
            .create_entry(1, &UploadRequest::new("docs", "folder"))
            .await
            .unwrap();
        let id = entry.id.to_string();

        assert!(matches!(
            service.set_visibility(2, &id, true).await,
            Err(VaultError::NotFound(_))
        ));
        assert!(service.set_visibility(1, &id, true).await.unwrap().is_public);
        assert!(service.set_visibility(1, &id, true).await.unwrap().is_public);
        assert!(!service.set_visibility(1, &id, false).await.unwrap().is_public);
        assert!(matches!(
            service.set_visibility(1, "x", true).await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_contents() {
        let fx = setup().await;
        let service = fx.service();

        let file = service
            .create_entry(1, &UploadRequest::new("hello.txt", "file").with_data(HELLO_B64))
            .await
            .unwrap();
        let id = file.id.to_string();

        let contents = service.read_contents(Some(1), &id, None).await.unwrap();
        assert_eq!(contents.bytes, b"Hello Webstack!\n");
        assert_eq!(contents.content_type, "text/plain");
        assert_eq!(contents.name, "hello.txt");

        assert!(matches!(
            service.read_contents(None, &id, None).await,
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            service.read_contents(Some(2), &id, None).await,
            Err(VaultError::NotFound(_))
        ));

        service.set_visibility(1, &id, true).await.unwrap();
        assert!(service.read_contents(None, &id, None).await.is_ok());
        assert!(service.read_contents(Some(2), &id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_read_contents_folder_and_missing_blob() {
        let fx = setup().await;
        let service = fx.service();

        let folder = service
            .create_entry(1, &UploadRequest::new("docs", "folder").with_public(true))
            .await
            .unwrap();
        assert!(matches!(
            service.read_contents(Some(1), &folder.id.to_string(), None).await,
            Err(VaultError::NotFound(_))
        ));

        let file = service
            .create_entry(1, &UploadRequest::new("a.bin", "file").with_data(HELLO_B64))
            .await
            .unwrap();
        let stored = FileEntryRepository::new(fx.db.pool())
            .get_by_id(file.id)
            .await
            .unwrap()
            .unwrap();
        fx.storage
            .delete(stored.local_path.as_deref().unwrap())
            .await
            .unwrap();

        assert!(matches!(
            service.read_contents(Some(1), &file.id.to_string(), None).await,
            Err(VaultError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_read_contents_sizes() {
        let fx = setup().await;
        let service = fx.service();

        let file = service
            .create_entry(1, &UploadRequest::new("x.png", "image").with_data(HELLO_B64))
            .await
            .unwrap();
        let id = file.id.to_string();

        assert!(matches!(
            service.read_contents(Some(1), &id, Some("250")).await,
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            service.read_contents(Some(1), &id, Some("300")).await,
            Err(VaultError::Validation(_))
        ));

        let stored = FileEntryRepository::new(fx.db.pool())
            .get_by_id(file.id)
            .await
            .unwrap()
            .unwrap();
        let thumb = BlobStore::derivative_path(stored.local_path.as_deref().unwrap(), 250);
        fx.storage.write_at(&thumb, b"thumb").await.unwrap();

        let contents = service.read_contents(Some(1), &id, Some("250")).await.unwrap();
        assert_eq!(contents.bytes, b"thumb");
        assert_eq!(contents.content_type, "image/png");
    }
}
