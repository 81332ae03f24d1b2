//! Per-user notification model.

use canteiro_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A notification row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub company_id: Option<DbId>,
    pub event_type: String,
    pub title: String,
    pub body: Option<String>,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
