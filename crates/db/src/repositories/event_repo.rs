//! Repository for the `events` table.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::EventRow;

/// Provides the durable event log.
pub struct EventRepo;

impl EventRepo {
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        actor_user_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO events (event_type, source_entity_type, source_entity_id,
                                 actor_user_id, payload)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(event_type)
        .bind(source_entity_type)
        .bind(source_entity_id)
        .bind(actor_user_id)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Recent events of one type, newest first. Used by admin tooling.
    pub async fn list_recent(
        pool: &PgPool,
        event_type: &str,
        limit: i64,
    ) -> Result<Vec<EventRow>, sqlx::Error> {
        sqlx::query_as::<_, EventRow>(
            "SELECT id, event_type, source_entity_type, source_entity_id, actor_user_id,
                    payload, created_at
             FROM events WHERE event_type = $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(event_type)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
