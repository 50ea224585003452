//! Service and repository initialization.

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::{Arc, Weak};

use fotofair_core::Config;
use fotofair_db::{CatalogRepository, TaskRepository};
use fotofair_ingest::{CatalogWriter, IngestOrchestrator};
use fotofair_processing::{MediaPipeline, PreviewPipeline, WatermarkAsset};
use fotofair_storage::Storage;
use fotofair_worker::{TaskHandlerContext, TaskQueue, TaskQueueConfig};

use crate::state::AppState;

/// Build the application state, wiring the task queue to dispatch back into
/// it. The queue holds only a weak reference to the state, so the worker
/// never keeps the application alive by itself.
pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let catalog_repository = CatalogRepository::new(pool.clone());
    let task_repository = TaskRepository::new(pool.clone());

    let watermark = WatermarkAsset::load(&config.watermark_path)
        .context("Failed to load watermark asset")?;
    tracing::info!(path = %config.watermark_path, "Watermark asset loaded");

    let pipeline: Arc<dyn MediaPipeline> =
        Arc::new(PreviewPipeline::new(storage.clone(), watermark));

    let orchestrator = Arc::new(IngestOrchestrator::new(
        Arc::new(catalog_repository.clone()) as Arc<dyn CatalogWriter>,
        pipeline.clone(),
    ));

    let task_queue_config = TaskQueueConfig {
        max_workers: config.task_queue_max_workers,
        poll_interval_ms: config.task_queue_poll_interval_ms,
        default_timeout_seconds: config.task_queue_default_timeout_seconds,
        max_attempts: config.task_queue_max_attempts,
        retry_backoff_base_secs: config.task_queue_retry_backoff_base_secs,
    };

    let state = Arc::new_cyclic(|weak: &Weak<AppState>| {
        let context = weak.clone() as Weak<dyn TaskHandlerContext>;
        let task_queue = TaskQueue::new(
            task_repository.clone(),
            task_queue_config.clone(),
            context,
            Some(pool.clone()),
        );
        AppState {
            config: config.clone(),
            pool,
            catalog_repository,
            task_repository,
            task_queue,
            storage,
            pipeline,
            orchestrator,
        }
    });

    tracing::info!(
        max_workers = task_queue_config.max_workers,
        max_attempts = task_queue_config.max_attempts,
        "Task queue system initialized"
    );

    Ok(state)
}
