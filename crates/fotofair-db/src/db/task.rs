//! Task repository: the persistent queue behind background archive ingestion.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so concurrent workers never grab
//! the same row. Completed tasks are deleted rather than retained; failed
//! tasks keep their row and error payload for inspection.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use fotofair_core::models::{Task, TaskStatus, TaskType};

/// NOTIFY channel that wakes idle workers when a task is inserted.
pub const TASK_NOTIFY_CHANNEL: &str = "fotofair_new_task";

const TASK_COLUMNS: &str = r#"
    id,
    task_type,
    status,
    priority,
    payload,
    result,
    scheduled_at,
    started_at,
    completed_at,
    retry_count,
    max_attempts,
    timeout_seconds,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a task and notify idle workers in the same transaction.
    #[tracing::instrument(skip(self, payload))]
    pub async fn create_task(
        &self,
        task_type: TaskType,
        payload: serde_json::Value,
        priority: i32,
        scheduled_at: Option<DateTime<Utc>>,
        max_attempts: i32,
        timeout_seconds: Option<i32>,
    ) -> Result<Task> {
        let scheduled_at = scheduled_at.unwrap_or_else(Utc::now);
        let status = if scheduled_at > Utc::now() {
            TaskStatus::Scheduled
        } else {
            TaskStatus::Pending
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction for task creation")?;

        let task: Task = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            INSERT INTO tasks (
                task_type, status, priority, payload, scheduled_at,
                max_attempts, timeout_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task_type.to_string())
        .bind(status)
        .bind(priority)
        .bind(payload)
        .bind(scheduled_at)
        .bind(max_attempts)
        .bind(timeout_seconds)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert task into database")?;

        // Non-fatal: workers fall back to polling when NOTIFY is unavailable.
        if let Err(e) = sqlx::query(&format!("SELECT pg_notify('{TASK_NOTIFY_CHANNEL}', '')"))
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(
                error = %e,
                task_id = %task.id,
                "Failed to send pg_notify for new task, workers will discover it via polling"
            );
        }

        tx.commit()
            .await
            .context("Failed to commit transaction for task creation")?;

        tracing::info!(
            task_id = %task.id,
            task_type = %task.task_type,
            priority = priority,
            "Task created"
        );

        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>> {
        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch task")?;

        Ok(task)
    }

    /// Atomically claim the next runnable task and mark it running.
    #[tracing::instrument(skip(self))]
    pub async fn claim_next_task(&self) -> Result<Option<Task>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE status IN ('pending', 'scheduled')
                AND scheduled_at <= NOW()
            ORDER BY priority DESC, scheduled_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch next task")?;

        if let Some(task) = task {
            let claimed: Task = sqlx::query_as::<Postgres, Task>(&format!(
                r#"
                UPDATE tasks
                SET status = 'running',
                    started_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {TASK_COLUMNS}
                "#
            ))
            .bind(task.id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to mark task running")?;

            tx.commit().await.context("Failed to commit transaction")?;

            tracing::debug!(
                task_id = %claimed.id,
                task_type = %claimed.task_type,
                "Task claimed"
            );

            Ok(Some(claimed))
        } else {
            tx.rollback().await.ok();
            Ok(None)
        }
    }

    /// Remove a completed task. Finished work leaves no queue residue;
    /// only failures are worth keeping around.
    #[tracing::instrument(skip(self))]
    pub async fn mark_completed(&self, task_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete completed task")?;

        tracing::info!(task_id = %task_id, "Task completed");

        Ok(())
    }

    /// Mark a task failed, retaining the row and error details.
    #[tracing::instrument(skip(self, error))]
    pub async fn mark_failed(&self, task_id: Uuid, error: serde_json::Value) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = 'failed',
                result = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(error)
        .fetch_one(&self.pool)
        .await
        .context("Failed to mark task as failed")?;

        tracing::error!(
            task_id = %task_id,
            task_type = %task.task_type,
            retry_count = task.retry_count,
            "Task failed"
        );

        Ok(task)
    }

    /// Bump the retry count and push the task back into the queue with a
    /// delayed `scheduled_at`.
    #[tracing::instrument(skip(self))]
    pub async fn schedule_retry(&self, task_id: Uuid, delay_seconds: i64) -> Result<Task> {
        let task: Task = sqlx::query_as::<Postgres, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = 'pending',
                retry_count = retry_count + 1,
                scheduled_at = NOW() + ($2 * interval '1 second'),
                started_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(delay_seconds)
        .fetch_one(&self.pool)
        .await
        .context("Failed to schedule task retry")?;

        tracing::info!(
            task_id = %task_id,
            retry_count = task.retry_count,
            max_attempts = task.max_attempts,
            delay_seconds = delay_seconds,
            "Task retry scheduled"
        );

        Ok(task)
    }
}
