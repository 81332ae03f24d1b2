//! Daily site report (RDO) model and DTOs.

use canteiro_core::types::{DbId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// RDO status values as stored in the `rdos.status` column.
pub const RDO_DRAFT: &str = "draft";
pub const RDO_SUBMITTED: &str = "submitted";
pub const RDO_APPROVED: &str = "approved";
pub const RDO_REJECTED: &str = "rejected";

/// An RDO row from the `rdos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rdo {
    pub id: DbId,
    pub project_id: DbId,
    pub report_date: NaiveDate,
    pub weather_morning: Option<String>,
    pub weather_afternoon: Option<String>,
    pub workforce_count: i32,
    pub equipment_notes: Option<String>,
    pub activities: Option<String>,
    pub occurrences: Option<String>,
    pub status: String,
    pub author_id: DbId,
    pub approved_by: Option<DbId>,
    pub decision_note: Option<String>,
    pub decided_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an RDO. Reports start in `draft`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRdo {
    pub report_date: NaiveDate,
    pub weather_morning: Option<String>,
    pub weather_afternoon: Option<String>,
    pub workforce_count: Option<i32>,
    pub equipment_notes: Option<String>,
    pub activities: Option<String>,
    pub occurrences: Option<String>,
}

/// DTO for updating an RDO. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRdo {
    pub weather_morning: Option<String>,
    pub weather_afternoon: Option<String>,
    pub workforce_count: Option<i32>,
    pub equipment_notes: Option<String>,
    pub activities: Option<String>,
    pub occurrences: Option<String>,
}

/// Query filter for RDO listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RdoFilter {
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
