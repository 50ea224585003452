//! Application state shared by handlers and the background worker.

use std::sync::Arc;

use sqlx::PgPool;

use fotofair_core::Config;
use fotofair_db::{CatalogRepository, TaskRepository};
use fotofair_ingest::IngestOrchestrator;
use fotofair_processing::MediaPipeline;
use fotofair_storage::Storage;
use fotofair_worker::TaskQueue;

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub catalog_repository: CatalogRepository,
    pub task_repository: TaskRepository,
    pub task_queue: TaskQueue,
    pub storage: Arc<dyn Storage>,
    pub pipeline: Arc<dyn MediaPipeline>,
    pub orchestrator: Arc<IngestOrchestrator>,
}
