//! Task handler context trait.
//!
//! The API implements this trait for its application state. The worker calls
//! `dispatch_task` when processing a claimed task; the implementation matches
//! on task type and invokes the appropriate handler.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use fotofair_core::models::Task;

/// Context for task dispatch.
///
/// Implemented by the API's application state. The worker holds a weak
/// reference so the queue never keeps the application state alive on its own.
#[async_trait]
pub trait TaskHandlerContext: Send + Sync {
    /// Dispatch a task to the appropriate handler and return its result.
    async fn dispatch_task(self: Arc<Self>, task: &Task) -> Result<serde_json::Value>;
}
