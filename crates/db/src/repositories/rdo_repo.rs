//! Repository for the `rdos` table.
//!
//! All queries are project-scoped; the handler layer has already verified
//! the project belongs to the caller's company. Status transitions use
//! conditional UPDATEs (`WHERE status = ...`) so a concurrent transition
//! loses cleanly instead of overwriting.

use canteiro_core::types::DbId;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::models::rdo::{CreateRdo, Rdo, RdoFilter, UpdateRdo};

const COLUMNS: &str = "id, project_id, report_date, weather_morning, weather_afternoon, \
                       workforce_count, equipment_notes, activities, occurrences, status, \
                       author_id, approved_by, decision_note, decided_at, created_at, updated_at";

/// Provides CRUD and workflow operations for daily reports.
pub struct RdoRepo;

impl RdoRepo {
    /// Insert a new draft RDO. The `uq_rdos_project_report_date` constraint
    /// rejects a second report for the same date.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        author_id: DbId,
        input: &CreateRdo,
    ) -> Result<Rdo, sqlx::Error> {
        let query = format!(
            "INSERT INTO rdos (project_id, report_date, weather_morning, weather_afternoon,
                               workforce_count, equipment_notes, activities, occurrences, author_id)
             VALUES ($1, $2, $3, $4, COALESCE($5, 0), $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rdo>(&query)
            .bind(project_id)
            .bind(input.report_date)
            .bind(&input.weather_morning)
            .bind(&input.weather_afternoon)
            .bind(input.workforce_count)
            .bind(&input.equipment_notes)
            .bind(&input.activities)
            .bind(&input.occurrences)
            .bind(author_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<Rdo>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rdos WHERE id = $1 AND project_id = $2");
        sqlx::query_as::<_, Rdo>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// List a project's RDOs, newest report date first, with optional
    /// status and date-range filters.
    pub async fn list(
        pool: &PgPool,
        project_id: DbId,
        filter: &RdoFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Rdo>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rdos
             WHERE project_id = $1
               AND ($2::text IS NULL OR status = $2)
               AND ($3::date IS NULL OR report_date >= $3)
               AND ($4::date IS NULL OR report_date <= $4)
             ORDER BY report_date DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Rdo>(&query)
            .bind(project_id)
            .bind(&filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_date(
        pool: &PgPool,
        project_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<Rdo>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rdos WHERE project_id = $1 AND report_date = $2");
        sqlx::query_as::<_, Rdo>(&query)
            .bind(project_id)
            .bind(date)
            .fetch_optional(pool)
            .await
    }

    /// Update report content. Editing a rejected report sends it back to
    /// `draft` and clears the previous decision; approved and submitted
    /// reports are not editable.
    pub async fn update_content(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
        input: &UpdateRdo,
    ) -> Result<Option<Rdo>, sqlx::Error> {
        let query = format!(
            "UPDATE rdos SET
                weather_morning = COALESCE($3, weather_morning),
                weather_afternoon = COALESCE($4, weather_afternoon),
                workforce_count = COALESCE($5, workforce_count),
                equipment_notes = COALESCE($6, equipment_notes),
                activities = COALESCE($7, activities),
                occurrences = COALESCE($8, occurrences),
                status = 'draft',
                approved_by = NULL,
                decision_note = NULL,
                decided_at = NULL,
                updated_at = NOW()
             WHERE id = $1 AND project_id = $2 AND status IN ('draft', 'rejected')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rdo>(&query)
            .bind(id)
            .bind(project_id)
            .bind(&input.weather_morning)
            .bind(&input.weather_afternoon)
            .bind(input.workforce_count)
            .bind(&input.equipment_notes)
            .bind(&input.activities)
            .bind(&input.occurrences)
            .fetch_optional(pool)
            .await
    }

    /// `draft -> submitted`. Returns `None` when the report is not in
    /// `draft` (the caller maps that to a conflict).
    pub async fn submit(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<Option<Rdo>, sqlx::Error> {
        let query = format!(
            "UPDATE rdos SET status = 'submitted', updated_at = NOW()
             WHERE id = $1 AND project_id = $2 AND status = 'draft'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rdo>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }

    /// `submitted -> approved | rejected`, recording the decision.
    pub async fn decide(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
        approver_id: DbId,
        approve: bool,
        note: Option<&str>,
    ) -> Result<Option<Rdo>, sqlx::Error> {
        let query = format!(
            "UPDATE rdos SET
                status = CASE WHEN $3 THEN 'approved' ELSE 'rejected' END,
                approved_by = $4,
                decision_note = $5,
                decided_at = NOW(),
                updated_at = NOW()
             WHERE id = $1 AND project_id = $2 AND status = 'submitted'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Rdo>(&query)
            .bind(id)
            .bind(project_id)
            .bind(approve)
            .bind(approver_id)
            .bind(note)
            .fetch_optional(pool)
            .await
    }

    /// Delete a draft report. Returns `true` if a row was removed; reports
    /// past `draft` are never deleted.
    pub async fn delete_draft(
        pool: &PgPool,
        project_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM rdos WHERE id = $1 AND project_id = $2 AND status = 'draft'")
                .bind(id)
                .bind(project_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
