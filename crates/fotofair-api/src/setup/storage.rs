//! Storage backend setup.

use anyhow::{Context, Result};
use std::sync::Arc;

use fotofair_core::Config;
use fotofair_storage::{create_storage, Storage};

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    tracing::info!(
        backend = ?config.storage_backend,
        "Storage backend initialized"
    );

    Ok(storage)
}
