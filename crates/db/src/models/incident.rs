//! Incident entity model and DTOs.

use canteiro_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An incident row from the `incidents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Incident {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub status: String,
    pub occurred_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub reported_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for reporting a new incident.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIncident {
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub occurred_at: Timestamp,
}

/// DTO for updating an incident. All fields are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateIncident {
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
}
