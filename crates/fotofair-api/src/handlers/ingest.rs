//! Archive upload handler: accepts a ZIP, spools it to the temp directory,
//! and enqueues a background ingestion task. The HTTP response acknowledges
//! acceptance; processing happens in the worker.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use fotofair_core::models::{ArchiveIngestPayload, Priority, Task, TaskType};
use fotofair_core::AppError;
use fotofair_ingest::TempArchiveGuard;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct IngestAccepted {
    pub success: bool,
    pub message: String,
    pub task_id: Uuid,
}

fn is_zip_filename(filename: &str) -> bool {
    filename
        .rsplit('.')
        .next()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
        && filename.contains('.')
}

/// Spool the uploaded archive field to a uniquely named temp file, enforcing
/// the configured size cap while streaming.
async fn spool_archive(
    field: &mut axum::extract::multipart::Field<'_>,
    tmp_dir: &str,
    max_bytes: usize,
) -> Result<PathBuf, HttpAppError> {
    tokio::fs::create_dir_all(tmp_dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create temp directory: {}", e)))?;

    let path = PathBuf::from(tmp_dir).join(format!("{}.zip", Uuid::new_v4()));
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;

    let mut written: usize = 0;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(
                    AppError::InvalidInput(format!("Failed to read upload: {}", e)).into(),
                );
            }
        };

        written += chunk.len();
        if written > max_bytes {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::PayloadTooLarge(format!(
                "Archive exceeds the maximum of {} bytes",
                max_bytes
            ))
            .into());
        }

        if let Err(e) = file.write_all(&chunk).await {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::Internal(format!("Failed to write temp file: {}", e)).into());
        }
    }

    file.flush()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to flush temp file: {}", e)))?;

    Ok(path)
}

#[utoipa::path(
    post,
    path = "/api/v0/events/ingest",
    tag = "ingest",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Archive accepted for background processing", body = IngestAccepted),
        (status = 400, description = "Missing or non-ZIP file", body = ErrorResponse),
        (status = 413, description = "Archive too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "ingest_archive"))]
pub async fn upload_archive(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IngestAccepted>), HttpAppError> {
    // The guard removes the spooled file if anything fails between spooling
    // and task submission; once the task owns the path, the guard is disarmed.
    let mut spooled: Option<TempArchiveGuard> = None;
    let mut order_deadline: Option<DateTime<Utc>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| AppError::InvalidInput("File field has no filename".to_string()))?
                    .to_string();

                if !is_zip_filename(&filename) {
                    return Err(AppError::InvalidInput(
                        "Only .zip archives are accepted".to_string(),
                    )
                    .into());
                }

                let path = spool_archive(
                    &mut field,
                    &state.config.upload_tmp_dir,
                    state.config.max_archive_size_bytes,
                )
                .await?;

                tracing::info!(
                    filename = %filename,
                    spooled_to = %path.display(),
                    "Archive upload received"
                );
                spooled = Some(TempArchiveGuard::new(path));
            }
            Some("order_deadline") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Invalid field: {}", e)))?;
                let parsed = raw.parse::<DateTime<Utc>>().map_err(|_| {
                    AppError::InvalidInput(
                        "order_deadline must be an RFC 3339 timestamp".to_string(),
                    )
                })?;
                order_deadline = Some(parsed);
            }
            _ => {}
        }
    }

    let spooled = spooled
        .ok_or_else(|| AppError::InvalidInput("Missing 'file' field with a ZIP archive".to_string()))?;

    let payload = Task::payload_from(&ArchiveIngestPayload {
        archive_path: spooled.path().to_path_buf(),
        order_deadline,
    });

    let task_id = state
        .task_queue
        .submit_task(TaskType::ArchiveIngest, payload, Priority::Normal, None)
        .await?;

    // The task row now references the file; it is cleaned up after processing.
    spooled.keep();

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAccepted {
            success: true,
            message: "Archive accepted and will be processed in the background".to_string(),
            task_id,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_filenames_accepted() {
        assert!(is_zip_filename("gala.zip"));
        assert!(is_zip_filename("GALA.ZIP"));
        assert!(is_zip_filename("a.b.zip"));
    }

    #[test]
    fn non_zip_filenames_rejected() {
        assert!(!is_zip_filename("gala.tar.gz"));
        assert!(!is_zip_filename("gala"));
        assert!(!is_zip_filename("zip"));
        assert!(!is_zip_filename("photos.rar"));
    }
}
