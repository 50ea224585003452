//! Storage abstraction trait
//!
//! Defines the `Storage` trait that all storage backends implement, plus the
//! error taxonomy for storage operations.

use crate::StorageBackend;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Access class of a stored object.
///
/// `Public` objects (watermarked previews) are readable by any browser.
/// `Private` objects (full-resolution originals) are gated: on S3 the bucket
/// policy only opens the `preview/` prefix and private objects are reached
/// through presigned GETs; the local backend only serves the `preview/`
/// prefix over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Public,
    Private,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait so the
/// media pipeline can work with any backend without coupling to provider
/// details.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a file under the given storage key and return its URL.
    ///
    /// For `StorageClass::Public` the returned URL is directly fetchable.
    /// For `StorageClass::Private` it is the canonical object URL; access
    /// requires a presigned URL from [`Storage::presigned_get_url`].
    async fn upload(
        &self,
        storage_key: &str,
        content_type: &str,
        class: StorageClass,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Download a file by its storage key.
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing key is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Generate a temporary URL granting read access to a private object
    /// (used when a purchased full-resolution photo is handed to the buyer).
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// The storage backend type.
    fn backend_type(&self) -> StorageBackend;
}
