//! Background task handlers and the dispatch glue between the worker queue
//! and the application state.

mod archive_ingest_handler;

pub use archive_ingest_handler::ArchiveIngestTaskHandler;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use fotofair_core::models::{Task, TaskType};
use fotofair_worker::TaskHandlerContext;

use crate::state::AppState;

/// One handler per task type. The worker calls through
/// [`TaskHandlerContext::dispatch_task`], which routes here.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn process(&self, task: &Task, state: Arc<AppState>) -> Result<serde_json::Value>;
}

#[async_trait]
impl TaskHandlerContext for AppState {
    async fn dispatch_task(self: Arc<Self>, task: &Task) -> Result<serde_json::Value> {
        match task.task_type {
            TaskType::ArchiveIngest => ArchiveIngestTaskHandler.process(task, self).await,
        }
    }
}
