//! Repository for the `subscriptions` and `stripe_events` tables.
//!
//! The multi-step writes triggered by webhook events live here as single
//! transactions so a mid-sequence failure cannot leave the subscription,
//! surveys, and usage rows disagreeing with each other.

use canteiro_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::subscription::Subscription;

const COLUMNS: &str = "id, company_id, stripe_customer_id, stripe_subscription_id, plan, status, \
                       current_period_end, cancel_at_period_end, created_at, updated_at";

/// Provides subscription lifecycle operations.
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    pub async fn find_by_company(
        pool: &PgPool,
        company_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscriptions WHERE company_id = $1");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(company_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_stripe_customer(
        pool: &PgPool,
        stripe_customer_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscriptions WHERE stripe_customer_id = $1");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(stripe_customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Upsert the company's subscription after checkout completes: link the
    /// Stripe ids and activate the purchased plan.
    pub async fn activate(
        pool: &PgPool,
        company_id: DbId,
        stripe_customer_id: &str,
        stripe_subscription_id: &str,
        plan: &str,
        current_period_end: Option<Timestamp>,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriptions
                (company_id, stripe_customer_id, stripe_subscription_id, plan, status,
                 current_period_end, cancel_at_period_end)
             VALUES ($1, $2, $3, $4, 'active', $5, FALSE)
             ON CONFLICT ON CONSTRAINT uq_subscriptions_company DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                plan = EXCLUDED.plan,
                status = 'active',
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = FALSE,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(company_id)
            .bind(stripe_customer_id)
            .bind(stripe_subscription_id)
            .bind(plan)
            .bind(current_period_end)
            .fetch_one(pool)
            .await
    }

    /// Apply a `customer.subscription.updated` event.
    pub async fn apply_update(
        pool: &PgPool,
        stripe_subscription_id: &str,
        plan: Option<&str>,
        status: &str,
        current_period_end: Option<Timestamp>,
        cancel_at_period_end: bool,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET
                plan = COALESCE($2, plan),
                status = $3,
                current_period_end = COALESCE($4, current_period_end),
                cancel_at_period_end = $5,
                updated_at = NOW()
             WHERE stripe_subscription_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(stripe_subscription_id)
            .bind(plan)
            .bind(status)
            .bind(current_period_end)
            .bind(cancel_at_period_end)
            .fetch_optional(pool)
            .await
    }

    /// Mark a subscription `past_due` after a failed invoice payment.
    pub async fn mark_past_due(
        pool: &PgPool,
        stripe_customer_id: &str,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET status = 'past_due', updated_at = NOW()
             WHERE stripe_customer_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(stripe_customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a `customer.subscription.deleted` event in one transaction:
    ///
    /// 1. cancel the subscription and drop the plan to `free`,
    /// 2. archive the company's active surveys beyond `keep_active_surveys`
    ///    (most recently created survive),
    /// 3. close the open usage period and open a fresh `free` one carrying
    ///    the counters forward.
    ///
    /// Returns the updated subscription, or `None` when the Stripe
    /// subscription id is unknown (nothing is written in that case).
    pub async fn cancel_and_downgrade(
        pool: &PgPool,
        stripe_subscription_id: &str,
        keep_active_surveys: Option<i64>,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE subscriptions SET
                plan = 'free',
                status = 'canceled',
                cancel_at_period_end = FALSE,
                updated_at = NOW()
             WHERE stripe_subscription_id = $1
             RETURNING {COLUMNS}"
        );
        let Some(subscription) = sqlx::query_as::<_, Subscription>(&query)
            .bind(stripe_subscription_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(keep) = keep_active_surveys {
            sqlx::query(
                "UPDATE surveys SET status = 'archived', archived_at = NOW(), updated_at = NOW()
                 WHERE id IN (
                     SELECT id FROM surveys
                     WHERE company_id = $1 AND status = 'active'
                     ORDER BY created_at DESC
                     OFFSET $2
                 )",
            )
            .bind(subscription.company_id)
            .bind(keep)
            .execute(&mut *tx)
            .await?;
        }

        // Close the open usage period and open a free-plan one with the
        // counters carried forward.
        sqlx::query(
            "UPDATE usage_tracking SET period_end = CURRENT_DATE, updated_at = NOW()
             WHERE company_id = $1 AND period_end IS NULL",
        )
        .bind(subscription.company_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO usage_tracking
                (company_id, plan, period_start, projects_count, active_surveys_count,
                 storage_bytes, inbox_messages_count)
             SELECT $1, 'free', CURRENT_DATE,
                    (SELECT COUNT(*) FROM projects WHERE company_id = $1 AND deleted_at IS NULL),
                    (SELECT COUNT(*) FROM surveys WHERE company_id = $1 AND status = 'active'),
                    (SELECT COALESCE(SUM(size_bytes), 0) FROM attachments WHERE company_id = $1),
                    COALESCE((SELECT inbox_messages_count FROM usage_tracking
                              WHERE company_id = $1 ORDER BY period_start DESC, id DESC LIMIT 1), 0)",
        )
        .bind(subscription.company_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(subscription))
    }

    // -- Stripe event dedup -------------------------------------------------

    /// Record a Stripe event id. Returns `false` when the id was already
    /// recorded, in which case the caller must skip processing.
    pub async fn record_stripe_event(
        pool: &PgPool,
        stripe_event_id: &str,
        event_type: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO stripe_events (stripe_event_id, event_type)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_stripe_events_event_id DO NOTHING",
        )
        .bind(stripe_event_id)
        .bind(event_type)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
