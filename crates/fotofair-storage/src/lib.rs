//! Fotofair storage library
//!
//! Storage abstraction and backends for photo assets. Watermarked previews
//! are stored publicly readable; full-resolution originals are stored
//! access-controlled and handed out only after purchase.
//!
//! # Storage key format
//!
//! - **Previews**: `preview/{owner_id}/{filename}`
//! - **Originals**: `original/{owner_id}/{filename}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use fotofair_core::config::StorageBackend;
pub use keys::{original_key, preview_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageClass, StorageError, StorageResult};
