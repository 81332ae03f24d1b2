//! Repository for the `projects` table. Every query is company-scoped.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, UpdateProject};

const COLUMNS: &str = "id, company_id, name, address, client_name, status, starts_on, ends_on, \
                       created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project under a company, returning the created row.
    ///
    /// If `status` is `None` in the input, defaults to `planning`.
    pub async fn create(
        pool: &PgPool,
        company_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (company_id, name, address, client_name, status, starts_on, ends_on)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'planning'), $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.address)
            .bind(&input.client_name)
            .bind(&input.status)
            .bind(input.starts_on)
            .bind(input.ends_on)
            .fetch_one(pool)
            .await
    }

    /// Find a project by id within a company. Excludes soft-deleted rows.
    /// A project belonging to another company is indistinguishable from a
    /// missing one.
    pub async fn find_by_id(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// List a company's projects, most recently created first.
    pub async fn list(pool: &PgPool, company_id: DbId) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE company_id = $1 AND deleted_at IS NULL
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    /// Count non-deleted projects, for plan-limit checks.
    pub async fn count(pool: &PgPool, company_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM projects WHERE company_id = $1 AND deleted_at IS NULL",
        )
        .bind(company_id)
        .fetch_one(pool)
        .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($3, name),
                address = COALESCE($4, address),
                client_name = COALESCE($5, client_name),
                status = COALESCE($6, status),
                starts_on = COALESCE($7, starts_on),
                ends_on = COALESCE($8, ends_on),
                updated_at = NOW()
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.address)
            .bind(&input.client_name)
            .bind(&input.status)
            .bind(input.starts_on)
            .bind(input.ends_on)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a project. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(
        pool: &PgPool,
        company_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW()
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(company_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
