//! Catalog domain models: the event → flow → speech → member → media
//! hierarchy that archive ingestion populates and the storefront reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A photographed occasion (e.g. a competition date). Top of the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub date: DateTime<Utc>,
    /// Cutoff after which purchases against this event are no longer permitted.
    pub order_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an event row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewEvent {
    pub name: String,
    pub date: DateTime<Utc>,
    pub order_deadline: Option<DateTime<Utc>>,
}

/// A time-bounded session within an event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Flow {
    pub id: Uuid,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewFlow {
    pub name: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub event_id: Uuid,
}

/// A performance/act within a flow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Speech {
    pub id: Uuid,
    pub name: String,
    pub flow_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewSpeech {
    pub name: String,
    pub flow_id: Uuid,
}

/// An individual participant within a speech; owns an ordered photo set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Member {
    pub id: Uuid,
    pub speech_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One photographed image belonging to a member.
///
/// `preview` is the publicly readable watermarked variant; `full_version` is
/// the access-controlled original, gated behind purchase. `order` is 1-based
/// and gapless within a member.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Media {
    pub id: Uuid,
    pub filename: String,
    pub preview: String,
    pub full_version: String,
    pub order: i32,
    pub member_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMedia {
    pub filename: String,
    pub preview: String,
    pub full_version: String,
    pub order: i32,
    pub member_id: Uuid,
}
