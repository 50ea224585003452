//! Event CRUD handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use fotofair_core::models::{Event, NewEvent};
use fotofair_core::AppError;
use fotofair_db::{EventPage, UpdateEvent};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub order_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateEventRequest {
    pub name: String,
    pub date: DateTime<Utc>,
    pub order_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    15
}

#[utoipa::path(
    post,
    path = "/api/v0/events",
    tag = "events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(operation = "create_event"))]
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), HttpAppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Event name must not be empty".to_string()).into());
    }

    let event = state
        .catalog_repository
        .create_event(NewEvent {
            name: body.name,
            date: body.date,
            order_deadline: body.order_deadline,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path = "/api/v0/events/{id}",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, HttpAppError> {
    let event = state
        .catalog_repository
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    Ok(Json(event))
}

#[utoipa::path(
    get,
    path = "/api/v0/events",
    tag = "events",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of events")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<EventPage>, HttpAppError> {
    let page = state
        .catalog_repository
        .list_events(query.page, query.limit)
        .await?;

    Ok(Json(page))
}

#[utoipa::path(
    patch,
    path = "/api/v0/events/{id}",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(operation = "update_event"))]
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEventRequest>,
) -> Result<Json<Event>, HttpAppError> {
    let event = state
        .catalog_repository
        .update_event(
            id,
            UpdateEvent {
                name: body.name,
                date: body.date,
                order_deadline: body.order_deadline,
            },
        )
        .await?;

    Ok(Json(event))
}

#[utoipa::path(
    delete,
    path = "/api/v0/events/{id}",
    tag = "events",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event deleted"),
        (status = 404, description = "Event not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    state.catalog_repository.delete_event(id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
