//! Repository for the `attachments` table (metadata only; bytes live
//! behind the storage provider).

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::attachment::{Attachment, CreateAttachment};

const COLUMNS: &str = "id, company_id, entity_type, entity_id, file_name, content_type, \
                       size_bytes, storage_key, uploaded_by, created_at";

/// Provides metadata operations for attachments.
pub struct AttachmentRepo;

impl AttachmentRepo {
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        input: &CreateAttachment,
    ) -> Result<Attachment, sqlx::Error> {
        let query = format!(
            "INSERT INTO attachments (company_id, entity_type, entity_id, file_name,
                                      content_type, size_bytes, storage_key, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attachment>(&query)
            .bind(company_id)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.file_name)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(&input.storage_key)
            .bind(input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Attachment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM attachments WHERE id = $1 AND company_id = $2");
        sqlx::query_as::<_, Attachment>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_entity(
        pool: &PgPool,
        company_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<Attachment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attachments
             WHERE company_id = $1 AND entity_type = $2 AND entity_id = $3
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Attachment>(&query)
            .bind(company_id)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }

    /// Total stored bytes for a company, for plan-limit checks.
    pub async fn total_bytes(pool: &PgPool, company_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM attachments WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_one(pool)
        .await
    }

    /// Delete the metadata row, returning it so the caller can remove the
    /// stored object afterwards.
    pub async fn delete(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Attachment>, sqlx::Error> {
        let query = format!(
            "DELETE FROM attachments WHERE id = $1 AND company_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attachment>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }
}
