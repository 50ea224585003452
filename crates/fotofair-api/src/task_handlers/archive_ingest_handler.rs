//! Archive ingestion task handler.
//!
//! Runs the ingestion orchestrator against the temp file named in the task
//! payload. A missing source archive is unrecoverable: the file is deleted
//! on every exit path of a previous attempt, so no retry can bring it back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use fotofair_core::models::{ArchiveIngestPayload, Task};
use fotofair_core::TaskError;
use fotofair_ingest::ArchiveError;

use super::TaskHandler;
use crate::state::AppState;

pub struct ArchiveIngestTaskHandler;

#[async_trait]
impl TaskHandler for ArchiveIngestTaskHandler {
    #[tracing::instrument(skip(self, task, state), fields(task.id = %task.id))]
    async fn process(&self, task: &Task, state: Arc<AppState>) -> Result<serde_json::Value> {
        let payload: ArchiveIngestPayload = task
            .try_payload_as()
            .context("Failed to parse archive ingest payload")
            .map_err(TaskError::unrecoverable)
            .map_err(anyhow::Error::from)?;

        tracing::info!(
            archive = %payload.archive_path.display(),
            "Processing archive ingest task"
        );

        let report = state
            .orchestrator
            .run(&payload.archive_path, payload.order_deadline)
            .await
            .map_err(|err| {
                let source_missing = matches!(
                    err.downcast_ref::<ArchiveError>(),
                    Some(ArchiveError::SourceMissing(_))
                );
                if source_missing {
                    anyhow::Error::from(TaskError::unrecoverable(err))
                } else {
                    err
                }
            })?;

        Ok(json!({
            "events": report.events,
            "flows": report.flows,
            "speeches": report.speeches,
            "members": report.members,
            "media_ingested": report.media_ingested,
            "entries_skipped": report.entries_skipped,
            "media_skipped": report.media_skipped,
        }))
    }
}
