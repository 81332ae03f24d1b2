//! File attachment metadata model.

use canteiro_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// An attachment row from the `attachments` table. The bytes themselves
/// live behind the storage provider under `storage_key`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attachment {
    pub id: DbId,
    pub company_id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub uploaded_by: DbId,
    pub created_at: Timestamp,
}

/// DTO for inserting attachment metadata after a successful provider write.
#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub entity_type: String,
    pub entity_id: DbId,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub uploaded_by: DbId,
}
