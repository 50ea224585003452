//! Media pipeline: watermark the preview, then store preview and full
//! variants concurrently.
//!
//! The preview goes to the public `preview/{owner}` prefix; the untouched
//! original goes to the private `original/{owner}` prefix. The two uploads
//! are independent computations over the same input bytes and run in
//! parallel.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use fotofair_storage::{original_key, preview_key, Storage, StorageClass, StorageError};

use crate::image::watermark::{Watermark, WatermarkAsset, WatermarkError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source bytes are not a decodable image. Not retriable.
    #[error("media decode failed: {0}")]
    Decode(String),

    /// Storage-backend failure. Transient; the job envelope retries it.
    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("preview generation failed: {0}")]
    Preview(String),

    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl From<WatermarkError> for PipelineError {
    fn from(err: WatermarkError) -> Self {
        match err {
            WatermarkError::Decode(msg) => PipelineError::Decode(msg),
            WatermarkError::Encode(msg) | WatermarkError::Asset(msg) => {
                PipelineError::Preview(msg)
            }
        }
    }
}

/// Raw photo bytes pulled out of an archive entry or an upload form.
#[derive(Clone)]
pub struct RawUpload {
    pub buffer: Vec<u8>,
    pub original_filename: String,
}

/// Result of a completed pipeline run: both variant URLs plus the display
/// order the caller assigned.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub filename: String,
    pub preview: String,
    pub full_version: String,
    pub order: i32,
}

/// The transform-and-upload collaborator consumed by archive ingestion.
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    async fn upload_file(
        &self,
        owner_id: Uuid,
        order: i32,
        file: RawUpload,
    ) -> Result<UploadedMedia, PipelineError>;
}

/// Production pipeline: tiled watermark preview + dual upload.
pub struct PreviewPipeline {
    storage: Arc<dyn Storage>,
    watermark: Arc<WatermarkAsset>,
}

impl PreviewPipeline {
    pub fn new(storage: Arc<dyn Storage>, watermark: WatermarkAsset) -> Self {
        Self {
            storage,
            watermark: Arc::new(watermark),
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|e| e.to_lowercase()) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl MediaPipeline for PreviewPipeline {
    #[tracing::instrument(skip(self, file), fields(filename = %file.original_filename))]
    async fn upload_file(
        &self,
        owner_id: Uuid,
        order: i32,
        file: RawUpload,
    ) -> Result<UploadedMedia, PipelineError> {
        let RawUpload {
            buffer,
            original_filename,
        } = file;

        // Watermark compositing is CPU-bound; run it off the async pool.
        let asset = self.watermark.clone();
        let source = buffer.clone();
        let preview_bytes = tokio::task::spawn_blocking(move || {
            Watermark::apply_tiled(&source, &asset)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("watermark task panicked: {}", e)))??;

        let content_type = content_type_for(&original_filename);
        let preview_storage_key = preview_key(owner_id, &original_filename);
        let original_storage_key = original_key(owner_id, &original_filename);

        // The two uploads are independent; run them concurrently.
        let (preview, full_version) = tokio::try_join!(
            self.storage.upload(
                &preview_storage_key,
                content_type,
                StorageClass::Public,
                preview_bytes,
            ),
            self.storage.upload(
                &original_storage_key,
                content_type,
                StorageClass::Private,
                buffer,
            ),
        )?;

        tracing::debug!(
            owner_id = %owner_id,
            order = order,
            preview_key = %preview_storage_key,
            "Media variants uploaded"
        );

        Ok(UploadedMedia {
            filename: original_filename,
            preview,
            full_version,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fotofair_storage::LocalStorage;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn sample_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn watermark_asset() -> WatermarkAsset {
        let img = RgbaImage::from_pixel(20, 10, Rgba([0, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        WatermarkAsset::from_bytes(&buffer).unwrap()
    }

    async fn test_pipeline() -> (tempfile::TempDir, PreviewPipeline) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:3000/files".to_string())
            .await
            .unwrap();
        let pipeline = PreviewPipeline::new(Arc::new(storage), watermark_asset());
        (dir, pipeline)
    }

    #[tokio::test]
    async fn uploads_both_variants_under_owner_prefixes() {
        let (_dir, pipeline) = test_pipeline().await;
        let owner = Uuid::new_v4();

        let uploaded = pipeline
            .upload_file(
                owner,
                1,
                RawUpload {
                    buffer: sample_png(),
                    original_filename: "p1.png".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(uploaded.filename, "p1.png");
        assert_eq!(uploaded.order, 1);
        assert!(uploaded.preview.contains(&format!("preview/{}/p1.png", owner)));
        assert!(uploaded
            .full_version
            .contains(&format!("original/{}/p1.png", owner)));
    }

    #[tokio::test]
    async fn corrupt_image_fails_with_decode_error() {
        let (_dir, pipeline) = test_pipeline().await;

        let err = pipeline
            .upload_file(
                Uuid::new_v4(),
                1,
                RawUpload {
                    buffer: b"definitely not an image".to_vec(),
                    original_filename: "broken.jpg".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn content_types_from_extension() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
