//! Task status handler, for polling an accepted ingestion job.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use fotofair_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v0/tasks/{id}",
    tag = "tasks",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task status"),
        (status = 404, description = "Task not found (completed tasks are discarded)", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let task = state
        .task_repository
        .get_task(id)
        .await
        .map_err(HttpAppError::from)?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    Ok(Json(serde_json::json!({
        "id": task.id,
        "task_type": task.task_type,
        "status": task.status,
        "retry_count": task.retry_count,
        "max_attempts": task.max_attempts,
        "scheduled_at": task.scheduled_at,
        "started_at": task.started_at,
        "completed_at": task.completed_at,
        "result": task.result,
    })))
}
