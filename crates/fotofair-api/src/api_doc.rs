//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use fotofair_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fotofair API",
        version = "0.1.0",
        description = "Photo event catalog API. Bulk media enters through ZIP archive \
                       ingestion; events, members, and media are then managed through \
                       the catalog endpoints. All endpoints are versioned under /api/v0/."
    ),
    paths(
        // Events
        handlers::event::create_event,
        handlers::event::get_event,
        handlers::event::list_events,
        handlers::event::update_event,
        handlers::event::delete_event,
        // Archive ingestion
        handlers::ingest::upload_archive,
        handlers::tasks::get_task,
        // Media maintenance
        handlers::media::add_media,
        handlers::media::change_media_order,
        handlers::media::delete_media,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::event::CreateEventRequest,
        handlers::event::UpdateEventRequest,
        handlers::ingest::IngestAccepted,
        handlers::media::ChangeOrderRequest,
        models::Event,
        models::Flow,
        models::Speech,
        models::Member,
        models::Media,
    )),
    tags(
        (name = "events", description = "Event catalog management"),
        (name = "ingest", description = "Bulk ZIP archive ingestion"),
        (name = "tasks", description = "Background task status"),
        (name = "media", description = "Per-member media maintenance")
    )
)]
pub struct ApiDoc;
