//! Repository for the `usage_tracking` table.

use canteiro_core::types::DbId;
use sqlx::PgPool;

use crate::models::usage::UsagePeriod;

const COLUMNS: &str = "id, company_id, plan, period_start, period_end, projects_count, \
                       active_surveys_count, storage_bytes, inbox_messages_count, \
                       created_at, updated_at";

/// Provides usage-period operations.
pub struct UsageRepo;

impl UsageRepo {
    /// The company's open usage period, if any.
    pub async fn find_open(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Option<UsagePeriod>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM usage_tracking
             WHERE company_id = $1 AND period_end IS NULL"
        );
        sqlx::query_as::<_, UsagePeriod>(&query)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    /// Open a usage period for a plan, seeding counters from live data.
    /// No-op (returns the existing row) when an open period already exists.
    pub async fn open_period(
        pool: &PgPool,
        company_id: DbId,
        plan: &str,
    ) -> Result<UsagePeriod, sqlx::Error> {
        if let Some(existing) = Self::find_open(pool, company_id).await? {
            return Ok(existing);
        }
        let query = format!(
            "INSERT INTO usage_tracking
                (company_id, plan, period_start, projects_count, active_surveys_count, storage_bytes)
             VALUES ($1, $2, CURRENT_DATE,
                     (SELECT COUNT(*) FROM projects WHERE company_id = $1 AND deleted_at IS NULL),
                     (SELECT COUNT(*) FROM surveys WHERE company_id = $1 AND status = 'active'),
                     (SELECT COALESCE(SUM(size_bytes), 0) FROM attachments WHERE company_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UsagePeriod>(&query)
            .bind(company_id)
            .bind(plan)
            .fetch_one(pool)
            .await
    }

    /// Close the open period, stamping today as its end date.
    pub async fn close_open(pool: &PgPool, company_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE usage_tracking SET period_end = CURRENT_DATE, updated_at = NOW()
             WHERE company_id = $1 AND period_end IS NULL",
        )
        .bind(company_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Refresh the open period's resource counters from live data and bump
    /// the inbox message counter by `new_messages`.
    pub async fn refresh_counters(
        pool: &PgPool,
        company_id: DbId,
        new_messages: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE usage_tracking SET
                projects_count = (SELECT COUNT(*) FROM projects
                                  WHERE company_id = $1 AND deleted_at IS NULL),
                active_surveys_count = (SELECT COUNT(*) FROM surveys
                                        WHERE company_id = $1 AND status = 'active'),
                storage_bytes = (SELECT COALESCE(SUM(size_bytes), 0) FROM attachments
                                 WHERE company_id = $1),
                inbox_messages_count = inbox_messages_count + $2,
                updated_at = NOW()
             WHERE company_id = $1 AND period_end IS NULL",
        )
        .bind(company_id)
        .bind(new_messages)
        .execute(pool)
        .await?;
        Ok(())
    }
}
