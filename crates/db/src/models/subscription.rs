//! Customer subscription model (one row per company).

use canteiro_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Local subscription status values, mapped from Stripe's richer set by
/// `canteiro_billing::processor::map_stripe_status`.
pub const SUB_ACTIVE: &str = "active";
pub const SUB_PAST_DUE: &str = "past_due";
pub const SUB_CANCELED: &str = "canceled";
pub const SUB_INCOMPLETE: &str = "incomplete";
pub const SUB_PAUSED: &str = "paused";

/// A subscription row from the `subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: DbId,
    pub company_id: DbId,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan: String,
    pub status: String,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
