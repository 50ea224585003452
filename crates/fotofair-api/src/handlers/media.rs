//! Media maintenance handlers: add a single photo to a member, reorder, and
//! delete. Bulk ingestion goes through the archive upload instead.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use fotofair_core::models::{Media, NewMedia};
use fotofair_core::AppError;
use fotofair_processing::{PipelineError, RawUpload};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChangeOrderRequest {
    pub new_order: i32,
}

impl From<PipelineError> for HttpAppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Decode(msg) => HttpAppError(AppError::ImageProcessing(msg)),
            PipelineError::Upload(e) => HttpAppError(AppError::Storage(e.to_string())),
            PipelineError::Preview(msg) => HttpAppError(AppError::ImageProcessing(msg)),
            PipelineError::Internal(msg) => HttpAppError(AppError::Internal(msg)),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v0/members/{id}/media",
    tag = "media",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Media added at the end of the member's set", body = Media),
        (status = 400, description = "Missing file field", body = ErrorResponse),
        (status = 422, description = "File is not a decodable image", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "add_media"))]
pub async fn add_media(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Media>), HttpAppError> {
    let mut upload: Option<RawUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let original_filename = field
                .file_name()
                .ok_or_else(|| AppError::InvalidInput("File field has no filename".to_string()))?
                .to_string();
            let buffer = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?
                .to_vec();
            upload = Some(RawUpload {
                buffer,
                original_filename,
            });
        }
    }

    let upload = upload
        .ok_or_else(|| AppError::InvalidInput("Missing 'file' field with an image".to_string()))?;

    // New photos land at the end of the member's ordered set.
    let order = state.catalog_repository.next_media_order(member_id).await?;

    let uploaded = state.pipeline.upload_file(member_id, order, upload).await?;

    let media = state
        .catalog_repository
        .create_media(NewMedia {
            filename: uploaded.filename,
            preview: uploaded.preview,
            full_version: uploaded.full_version,
            order,
            member_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(media)))
}

#[utoipa::path(
    patch,
    path = "/api/v0/media/{id}/order",
    tag = "media",
    params(("id" = Uuid, Path, description = "Media ID")),
    request_body = ChangeOrderRequest,
    responses(
        (status = 200, description = "Media moved to the requested slot", body = Media),
        (status = 404, description = "Media not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "change_media_order"))]
pub async fn change_media_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ChangeOrderRequest>,
) -> Result<Json<Media>, HttpAppError> {
    let media = state
        .catalog_repository
        .change_media_order(id, body.new_order)
        .await?;

    Ok(Json(media))
}

#[utoipa::path(
    delete,
    path = "/api/v0/media/{id}",
    tag = "media",
    params(("id" = Uuid, Path, description = "Media ID")),
    responses(
        (status = 200, description = "Media deleted and the order gap closed"),
        (status = 404, description = "Media not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    state.catalog_repository.delete_media(id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
