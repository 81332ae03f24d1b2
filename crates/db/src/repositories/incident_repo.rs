//! Repository for the `incidents` table.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::incident::{CreateIncident, Incident, UpdateIncident};

const COLUMNS: &str = "id, project_id, title, description, severity, status, occurred_at, \
                       resolved_at, reported_by, created_at, updated_at";

/// Provides CRUD operations for incidents.
pub struct IncidentRepo;

impl IncidentRepo {
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        reporter_id: DbId,
        input: &CreateIncident,
    ) -> Result<Incident, sqlx::Error> {
        let query = format!(
            "INSERT INTO incidents (project_id, title, description, severity, occurred_at, reported_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(project_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.severity)
            .bind(input.occurred_at)
            .bind(reporter_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM incidents WHERE id = $1 AND project_id = $2");
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's incidents, most recent occurrence first.
    pub async fn list(pool: &PgPool, project_id: DbId) -> Result<Vec<Incident>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM incidents WHERE project_id = $1 ORDER BY occurred_at DESC"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
        input: &UpdateIncident,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "UPDATE incidents SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                severity = COALESCE($5, severity),
                status = COALESCE($6, status),
                updated_at = NOW()
             WHERE id = $1 AND project_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .bind(project_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.severity)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Mark an incident resolved. Returns `None` when already resolved or
    /// missing.
    pub async fn resolve(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<Incident>, sqlx::Error> {
        let query = format!(
            "UPDATE incidents SET status = 'resolved', resolved_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND project_id = $2 AND status <> 'resolved'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Incident>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, project_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM incidents WHERE id = $1 AND project_id = $2")
            .bind(id)
            .bind(project_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
