//! Usage-tracking period model.
//!
//! Each company has at most one open period (`period_end IS NULL`); the
//! billing processor closes it and opens a fresh one when the plan changes.

use canteiro_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

/// A usage row from the `usage_tracking` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UsagePeriod {
    pub id: DbId,
    pub company_id: DbId,
    pub plan: String,
    pub period_start: NaiveDate,
    pub period_end: Option<NaiveDate>,
    pub projects_count: i64,
    pub active_surveys_count: i64,
    pub storage_bytes: i64,
    pub inbox_messages_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
