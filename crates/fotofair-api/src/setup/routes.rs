//! Route configuration and setup.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, patch, post},
    Json, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use fotofair_core::{Config, StorageBackend};

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>> {
    let cors = setup_cors(config)?;

    let mut app = Router::new()
        .route("/api/v0/events", post(handlers::event::create_event))
        .route("/api/v0/events", get(handlers::event::list_events))
        .route("/api/v0/events/ingest", post(handlers::ingest::upload_archive))
        .route("/api/v0/events/{id}", get(handlers::event::get_event))
        .route("/api/v0/events/{id}", patch(handlers::event::update_event))
        .route("/api/v0/events/{id}", delete(handlers::event::delete_event))
        .route("/api/v0/tasks/{id}", get(handlers::tasks::get_task))
        .route("/api/v0/members/{id}/media", post(handlers::media::add_media))
        .route(
            "/api/v0/media/{id}/order",
            patch(handlers::media::change_media_order),
        )
        .route("/api/v0/media/{id}", delete(handlers::media::delete_media))
        .route("/health", get(health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(state.clone());

    // Local backend: serve the public preview prefix over HTTP. Originals
    // stay off the router; they are reached through presigned URLs only.
    if config.storage_backend == StorageBackend::Local {
        let preview_dir = PathBuf::from(&config.local_storage_path).join("preview");
        app = app.nest_service("/files/preview", ServeDir::new(preview_dir));
    }

    let app = app
        .layer(DefaultBodyLimit::max(config.max_archive_size_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers(Any)
    };

    Ok(cors)
}
