//! Application setup and initialization.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use anyhow::{Context, Result};
use std::sync::Arc;

use fotofair_core::Config;

use crate::state::AppState;

/// Initialize the entire application: database, storage, services, routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;
    tracing::info!(environment = %config.environment, "Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;

    let store = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, pool, store).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
