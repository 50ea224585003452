//! Core types shared across the fotofair workspace: configuration, the
//! unified error type, and the catalog/task domain models.

pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, StorageBackend};
pub use error::{AppError, TaskError};
