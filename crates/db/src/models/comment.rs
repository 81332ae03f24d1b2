//! Polymorphic comment model.

use canteiro_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Entities a comment can attach to.
pub const COMMENT_ON_RDO: &str = "rdo";
pub const COMMENT_ON_INCIDENT: &str = "incident";

/// A comment row from the `comments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    pub company_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub author_id: DbId,
    pub body: String,
    pub created_at: Timestamp,
}

/// DTO for creating a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub entity_type: String,
    pub entity_id: DbId,
    pub body: String,
}
