//! Thumbnail generation for uploaded images.
//!
//! For every upload the job decodes the original blob and writes one resized
//! copy per width in [`THUMBNAIL_WIDTHS`] next to it. Writes overwrite, so a
//! redelivered job leaves exactly one derivative per width.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::db::Database;
use crate::file::{BlobStore, FileEntryRepository, THUMBNAIL_WIDTHS};
use crate::{Result, VaultError};

use super::worker::JobHandler;
use super::payload_id;

/// Queue consumed by [`ThumbnailJob`].
pub const THUMBNAIL_QUEUE: &str = "thumbnails";

/// Payload enqueued after each non-folder upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailPayload {
    pub file_id: i64,
    pub user_id: i64,
}

/// Resize `image` to `width`, keeping its aspect ratio, and encode it as
/// `format`. Formats this build cannot encode fall back to PNG.
pub fn render_thumbnail(image: &DynamicImage, width: u32, format: ImageFormat) -> Result<Vec<u8>> {
    let (src_width, src_height) = (image.width().max(1), image.height());
    let height = ((u64::from(src_height) * u64::from(width) + u64::from(src_width) / 2)
        / u64::from(src_width))
    .max(1) as u32;

    let resized = image.resize_exact(width, height, FilterType::Triangle);

    let format = if format.writing_enabled() {
        format
    } else {
        ImageFormat::Png
    };

    let mut encoded = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut encoded), format)
        .map_err(|e| VaultError::Job(format!("encode {width}px thumbnail: {e}")))?;
    Ok(encoded)
}

/// Decode an image blob, returning `None` for anything that is not an image.
fn decode(bytes: &[u8]) -> Option<(DynamicImage, ImageFormat)> {
    let format = image::guess_format(bytes).ok()?;
    let image = image::load_from_memory_with_format(bytes, format).ok()?;
    Some((image, format))
}

/// Job handler producing the thumbnails of one entry.
pub struct ThumbnailJob {
    db: Arc<Database>,
    storage: BlobStore,
}

impl ThumbnailJob {
    pub fn new(db: Arc<Database>, storage: BlobStore) -> Self {
        Self { db, storage }
    }
}

#[async_trait]
impl JobHandler for ThumbnailJob {
    fn queue(&self) -> &'static str {
        THUMBNAIL_QUEUE
    }

    async fn handle(&self, payload: &Value) -> Result<()> {
        let file_id = payload_id(payload, "fileId")
            .ok_or_else(|| VaultError::JobFatal("Missing fileId".to_string()))?;
        let user_id = payload_id(payload, "userId")
            .ok_or_else(|| VaultError::JobFatal("Missing userId".to_string()))?;

        let entry = FileEntryRepository::new(self.db.pool())
            .get_owned(file_id, user_id)
            .await?
            .ok_or_else(|| VaultError::JobFatal("File not found".to_string()))?;

        let Some(local_path) = entry.local_path else {
            debug!(file_id, "Entry has no blob, nothing to thumbnail");
            return Ok(());
        };

        let original = match self.storage.read(&local_path).await {
            Ok(bytes) => bytes,
            Err(VaultError::NotFound(_)) => {
                return Err(VaultError::JobFatal("File not found".to_string()))
            }
            Err(e) => return Err(e),
        };

        let decoded = tokio::task::spawn_blocking(move || decode(&original))
            .await
            .map_err(|e| VaultError::Job(format!("decode task: {e}")))?;
        let Some((image, format)) = decoded else {
            debug!(file_id, name = %entry.name, "Not an image, skipping thumbnails");
            return Ok(());
        };
        let image = Arc::new(image);

        let renders = THUMBNAIL_WIDTHS.iter().map(|&width| {
            let image = Arc::clone(&image);
            let storage = self.storage.clone();
            let target = BlobStore::derivative_path(&local_path, width);
            async move {
                let bytes =
                    tokio::task::spawn_blocking(move || render_thumbnail(&image, width, format))
                        .await
                        .map_err(|e| VaultError::Job(format!("resize task: {e}")))??;
                storage.write_at(&target, &bytes).await
            }
        });
        try_join_all(renders).await?;

        info!(file_id, "Generated thumbnails");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::file::{EntryType, NewEntry};
    use serde_json::json;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 30, 30]),
        ));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    struct Fixture {
        db: Arc<Database>,
        storage: BlobStore,
        dir: TempDir,
    }

    impl Fixture {
        fn job(&self) -> ThumbnailJob {
            ThumbnailJob::new(Arc::clone(&self.db), self.storage.clone())
        }

        async fn upload(&self, content: &[u8], entry_type: EntryType) -> (i64, String) {
            let path = self.storage.write(content).await.unwrap();
            let entry = FileEntryRepository::new(self.db.pool())
                .create(&NewEntry::new(1, "x.png", entry_type).with_local_path(path.clone()))
                .await
                .unwrap();
            (entry.id, path)
        }

        fn blob_count(&self) -> usize {
            std::fs::read_dir(self.dir.path())
                .unwrap()
                .flatten()
                .map(|shard| std::fs::read_dir(shard.path()).unwrap().count())
                .sum()
        }
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        UserRepository::new(db.pool())
            .create(&NewUser::new("a@b.com", "h"))
            .await
            .unwrap();
        let dir = TempDir::new().unwrap();
        let storage = BlobStore::new(dir.path()).unwrap();
        Fixture {
            db: Arc::new(db),
            storage,
            dir,
        }
    }

    fn fatal_message(result: Result<()>) -> String {
        match result {
            Err(VaultError::JobFatal(msg)) => msg,
            other => panic!("expected fatal job error, got {other:?}"),
        }
    }

    #[test]
    fn test_render_thumbnail_keeps_aspect_ratio() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(1000, 500));

        let bytes = render_thumbnail(&image, 250, ImageFormat::Png).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (250, 125));
    }

    #[test]
    fn test_render_thumbnail_minimum_height() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(1000, 1));

        let bytes = render_thumbnail(&image, 100, ImageFormat::Png).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (100, 1));
    }

    #[tokio::test]
    async fn test_generates_all_widths() {
        let fx = setup().await;
        let (file_id, path) = fx.upload(&png_bytes(600, 400), EntryType::Image).await;

        fx.job()
            .handle(&json!({"fileId": file_id, "userId": 1}))
            .await
            .unwrap();

        for width in THUMBNAIL_WIDTHS {
            let bytes = fx
                .storage
                .read(&BlobStore::derivative_path(&path, width))
                .await
                .unwrap();
            let thumb = image::load_from_memory(&bytes).unwrap();
            assert_eq!(thumb.width(), width);
            assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        }
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let fx = setup().await;
        let (file_id, _path) = fx.upload(&png_bytes(300, 300), EntryType::Image).await;
        let payload = json!({"fileId": file_id.to_string(), "userId": "1"});

        fx.job().handle(&payload).await.unwrap();
        fx.job().handle(&payload).await.unwrap();

        assert_eq!(fx.blob_count(), 1 + THUMBNAIL_WIDTHS.len());
    }

    #[tokio::test]
    async fn test_missing_ids_are_fatal_and_write_nothing() {
        let fx = setup().await;
        let (file_id, _path) = fx.upload(&png_bytes(10, 10), EntryType::Image).await;

        let msg = fatal_message(fx.job().handle(&json!({"userId": 1})).await);
        assert_eq!(msg, "Missing fileId");

        let msg = fatal_message(fx.job().handle(&json!({"fileId": file_id})).await);
        assert_eq!(msg, "Missing userId");

        assert_eq!(fx.blob_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_file_or_wrong_owner_is_fatal() {
        let fx = setup().await;
        let (file_id, _path) = fx.upload(&png_bytes(10, 10), EntryType::Image).await;

        let msg = fatal_message(fx.job().handle(&json!({"fileId": 999, "userId": 1})).await);
        assert_eq!(msg, "File not found");

        let msg = fatal_message(
            fx.job()
                .handle(&json!({"fileId": file_id, "userId": 2}))
                .await,
        );
        assert_eq!(msg, "File not found");
    }

    #[tokio::test]
    async fn test_non_image_is_a_no_op() {
        let fx = setup().await;
        let (file_id, _path) = fx.upload(b"plain text", EntryType::File).await;

        fx.job()
            .handle(&json!({"fileId": file_id, "userId": 1}))
            .await
            .unwrap();
        assert_eq!(fx.blob_count(), 1);
    }

    #[tokio::test]
    async fn test_folder_is_a_no_op() {
        let fx = setup().await;
        let folder = FileEntryRepository::new(fx.db.pool())
            .create(&NewEntry::new(1, "docs", EntryType::Folder))
            .await
            .unwrap();

        fx.job()
            .handle(&json!({"fileId": folder.id, "userId": 1}))
            .await
            .unwrap();
    }
}
