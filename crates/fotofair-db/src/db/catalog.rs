//! Catalog repository: the event → flow → speech → member → media hierarchy.
//!
//! Creation methods double as the [`CatalogWriter`] seam the ingestion
//! orchestrator persists through. Media maintenance methods keep the
//! per-member `order` column 1-based and gapless: reordering shifts the rows
//! in between, deletion compacts the gap it leaves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use fotofair_core::models::{Event, Flow, Media, Member, NewEvent, NewFlow, NewMedia, NewSpeech, Speech};
use fotofair_core::AppError;
use fotofair_ingest::CatalogWriter;

/// Partial event update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdateEvent {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub order_deadline: Option<DateTime<Utc>>,
}

/// One page of events plus the unfiltered total for pagination headers.
#[derive(Debug, serde::Serialize)]
pub struct EventPage {
    pub events: Vec<Event>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "insert"))]
    pub async fn create_event(&self, event: NewEvent) -> Result<Event, AppError> {
        let event = sqlx::query_as::<Postgres, Event>(
            r#"
            INSERT INTO events (name, date, order_deadline)
            VALUES ($1, $2, $3)
            RETURNING id, name, date, order_deadline, created_at, updated_at
            "#,
        )
        .bind(&event.name)
        .bind(event.date)
        .bind(event.order_deadline)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(event_id = %event.id, name = %event.name, "Event created");

        Ok(event)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<Postgres, Event>(
            r#"
            SELECT id, name, date, order_deadline, created_at, updated_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Apply a partial update; unset fields keep their stored values.
    #[tracing::instrument(skip(self, update), fields(db.table = "events", db.operation = "update"))]
    pub async fn update_event(
        &self,
        event_id: Uuid,
        update: UpdateEvent,
    ) -> Result<Event, AppError> {
        let event = sqlx::query_as::<Postgres, Event>(
            r#"
            UPDATE events
            SET name = COALESCE($2, name),
                date = COALESCE($3, date),
                order_deadline = COALESCE($4, order_deadline),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, date, order_deadline, created_at, updated_at
            "#,
        )
        .bind(event_id)
        .bind(update.name)
        .bind(update.date)
        .bind(update.order_deadline)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        Ok(event)
    }

    /// Delete an event; flows, speeches, members and media cascade.
    #[tracing::instrument(skip(self), fields(db.table = "events", db.operation = "delete"))]
    pub async fn delete_event(&self, event_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        tracing::info!(event_id = %event_id, "Event deleted");

        Ok(())
    }

    /// Fetch one page of events, newest first, plus the unfiltered total.
    #[tracing::instrument(skip(self))]
    pub async fn list_events(&self, page: i64, limit: i64) -> Result<EventPage, AppError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        let events = sqlx::query_as::<Postgres, Event>(
            r#"
            SELECT id, name, date, order_deadline, created_at, updated_at
            FROM events
            ORDER BY date DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(EventPage {
            events,
            total,
            page,
            limit,
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "flows", db.operation = "insert"))]
    pub async fn create_flow(&self, flow: NewFlow) -> Result<Flow, AppError> {
        let flow = sqlx::query_as::<Postgres, Flow>(
            r#"
            INSERT INTO flows (name, starts_at, ends_at, event_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, starts_at, ends_at, event_id, created_at
            "#,
        )
        .bind(&flow.name)
        .bind(flow.from)
        .bind(flow.to)
        .bind(flow.event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(flow)
    }

    #[tracing::instrument(skip(self), fields(db.table = "speeches", db.operation = "insert"))]
    pub async fn create_speech(&self, speech: NewSpeech) -> Result<Speech, AppError> {
        let speech = sqlx::query_as::<Postgres, Speech>(
            r#"
            INSERT INTO speeches (name, flow_id)
            VALUES ($1, $2)
            RETURNING id, name, flow_id, created_at
            "#,
        )
        .bind(&speech.name)
        .bind(speech.flow_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(speech)
    }

    #[tracing::instrument(skip(self), fields(db.table = "members", db.operation = "insert"))]
    pub async fn create_member(&self, speech_id: Uuid) -> Result<Member, AppError> {
        let member = sqlx::query_as::<Postgres, Member>(
            r#"
            INSERT INTO members (speech_id)
            VALUES ($1)
            RETURNING id, speech_id, created_at
            "#,
        )
        .bind(speech_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "insert"))]
    pub async fn create_media(&self, media: NewMedia) -> Result<Media, AppError> {
        let media = sqlx::query_as::<Postgres, Media>(
            r#"
            INSERT INTO media (filename, preview, full_version, "order", member_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, filename, preview, full_version, "order", member_id, created_at
            "#,
        )
        .bind(&media.filename)
        .bind(&media.preview)
        .bind(&media.full_version)
        .bind(media.order)
        .bind(media.member_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(media)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_media(&self, media_id: Uuid) -> Result<Option<Media>, AppError> {
        let media = sqlx::query_as::<Postgres, Media>(
            r#"
            SELECT id, filename, preview, full_version, "order", member_id, created_at
            FROM media
            WHERE id = $1
            "#,
        )
        .bind(media_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(media)
    }

    /// Next free order slot for a member: one past the current maximum.
    #[tracing::instrument(skip(self))]
    pub async fn next_media_order(&self, member_id: Uuid) -> Result<i32, AppError> {
        let next: i32 = sqlx::query_scalar(
            r#"SELECT COALESCE(MAX("order"), 0) + 1 FROM media WHERE member_id = $1"#,
        )
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(next)
    }

    /// Move one media row to `new_order` within its member, shifting the
    /// rows in between by one so the sequence stays gapless.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "update"))]
    pub async fn change_media_order(
        &self,
        media_id: Uuid,
        new_order: i32,
    ) -> Result<Media, AppError> {
        let media = self
            .get_media(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;

        let old_order = media.order;
        if new_order == old_order {
            return Ok(media);
        }
        if new_order < 1 {
            return Err(AppError::InvalidInput(
                "Media order must be at least 1".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        if new_order > old_order {
            // Moving down: everything between slides up one slot.
            sqlx::query(
                r#"
                UPDATE media
                SET "order" = "order" - 1
                WHERE member_id = $1 AND "order" > $2 AND "order" <= $3
                "#,
            )
            .bind(media.member_id)
            .bind(old_order)
            .bind(new_order)
            .execute(&mut *tx)
            .await?;
        } else {
            // Moving up: everything between slides down one slot.
            sqlx::query(
                r#"
                UPDATE media
                SET "order" = "order" + 1
                WHERE member_id = $1 AND "order" >= $2 AND "order" < $3
                "#,
            )
            .bind(media.member_id)
            .bind(new_order)
            .bind(old_order)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<Postgres, Media>(
            r#"
            UPDATE media
            SET "order" = $2
            WHERE id = $1
            RETURNING id, filename, preview, full_version, "order", member_id, created_at
            "#,
        )
        .bind(media_id)
        .bind(new_order)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            media_id = %media_id,
            old_order = old_order,
            new_order = new_order,
            "Media reordered"
        );

        Ok(updated)
    }

    /// Delete one media row and close the gap it leaves in its member's
    /// order sequence.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete"))]
    pub async fn delete_media(&self, media_id: Uuid) -> Result<(), AppError> {
        let media = self
            .get_media(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(media_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE media
            SET "order" = "order" - 1
            WHERE member_id = $1 AND "order" > $2
            "#,
        )
        .bind(media.member_id)
        .bind(media.order)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(media_id = %media_id, "Media deleted");

        Ok(())
    }
}

#[async_trait]
impl CatalogWriter for CatalogRepository {
    async fn create_event(&self, event: NewEvent) -> anyhow::Result<Uuid> {
        Ok(CatalogRepository::create_event(self, event).await?.id)
    }

    async fn create_flow(&self, flow: NewFlow) -> anyhow::Result<Uuid> {
        Ok(CatalogRepository::create_flow(self, flow).await?.id)
    }

    async fn create_speech(&self, speech: NewSpeech) -> anyhow::Result<Uuid> {
        Ok(CatalogRepository::create_speech(self, speech).await?.id)
    }

    async fn create_member(&self, speech_id: Uuid) -> anyhow::Result<Uuid> {
        Ok(CatalogRepository::create_member(self, speech_id).await?.id)
    }

    async fn create_media(&self, media: NewMedia) -> anyhow::Result<Uuid> {
        Ok(CatalogRepository::create_media(self, media).await?.id)
    }
}
