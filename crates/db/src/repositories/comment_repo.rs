//! Repository for the `comments` table.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::comment::Comment;

const COLUMNS: &str = "id, company_id, entity_type, entity_id, author_id, body, created_at";

/// Provides operations for polymorphic comments.
pub struct CommentRepo;

impl CommentRepo {
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        entity_type: &str,
        entity_id: DbId,
        author_id: DbId,
        body: &str,
    ) -> Result<Comment, sqlx::Error> {
        let query = format!(
            "INSERT INTO comments (company_id, entity_type, entity_id, author_id, body)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(company_id)
            .bind(entity_type)
            .bind(entity_id)
            .bind(author_id)
            .bind(body)
            .fetch_one(pool)
            .await
    }

    /// Whether the target entity exists and belongs to the company. Guards
    /// comment creation against cross-tenant references.
    pub async fn entity_in_company(
        pool: &PgPool,
        company_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = match entity_type {
            "rdo" => {
                "SELECT EXISTS (
                     SELECT 1 FROM rdos r
                     JOIN projects p ON p.id = r.project_id
                     WHERE r.id = $1 AND p.company_id = $2 AND p.deleted_at IS NULL
                 )"
            }
            "incident" => {
                "SELECT EXISTS (
                     SELECT 1 FROM incidents i
                     JOIN projects p ON p.id = i.project_id
                     WHERE i.id = $1 AND p.company_id = $2 AND p.deleted_at IS NULL
                 )"
            }
            "project" => {
                "SELECT EXISTS (
                     SELECT 1 FROM projects
                     WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
                 )"
            }
            _ => return Ok(false),
        };
        sqlx::query_scalar(query)
            .bind(entity_id)
            .bind(company_id)
            .fetch_one(pool)
            .await
    }

    /// List comments on one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        company_id: DbId,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<Comment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM comments
             WHERE company_id = $1 AND entity_type = $2 AND entity_id = $3
             ORDER BY created_at"
        );
        sqlx::query_as::<_, Comment>(&query)
            .bind(company_id)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Comment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM comments WHERE id = $1 AND company_id = $2");
        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, company_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
