//! Webhook event processor: verified Stripe events in, local rows out.
//!
//! Every event passes through the `stripe_events` ledger first, so Stripe's
//! at-least-once delivery (and manual replays from its dashboard) cannot
//! double-apply a write. Multi-step writes are transactional inside the
//! repository layer; a failure after the ledger insert surfaces as an error
//! so the HTTP handler returns 500 and Stripe redelivers.

use std::sync::Arc;

use canteiro_core::plan::Plan;
use canteiro_core::types::DbId;
use canteiro_db::models::subscription::{
    SUB_ACTIVE, SUB_CANCELED, SUB_INCOMPLETE, SUB_PAST_DUE, SUB_PAUSED,
};
use canteiro_db::repositories::{SubscriptionRepo, UsageRepo};
use canteiro_db::DbPool;
use canteiro_events::bus::event_types;
use canteiro_events::{DomainEvent, EventBus};
use chrono::{DateTime, Utc};

use crate::client::{BillingClient, ClientError};
use crate::event::{
    event_types as stripe_types, CheckoutSession, Invoice, StripeEvent, StripeSubscription,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Stripe configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Webhook endpoint secret (`whsec_...`).
    pub webhook_secret: String,
    /// Secret API key (`sk_...`), optional; without it the processor works
    /// from webhook payloads alone.
    pub api_key: Option<String>,
    /// Price id of the Pro plan.
    pub price_pro: Option<String>,
    /// Price id of the Business plan.
    pub price_business: Option<String>,
}

impl BillingConfig {
    /// Load from environment. Returns `None` when `STRIPE_WEBHOOK_SECRET`
    /// is not set, signalling that billing is disabled.
    ///
    /// | Variable                | Required |
    /// |-------------------------|----------|
    /// | `STRIPE_WEBHOOK_SECRET` | yes      |
    /// | `STRIPE_API_KEY`        | no       |
    /// | `STRIPE_PRICE_PRO`      | no       |
    /// | `STRIPE_PRICE_BUSINESS` | no       |
    pub fn from_env() -> Option<Self> {
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET").ok()?;
        Some(Self {
            webhook_secret,
            api_key: std::env::var("STRIPE_API_KEY").ok(),
            price_pro: std::env::var("STRIPE_PRICE_PRO").ok(),
            price_business: std::env::var("STRIPE_PRICE_BUSINESS").ok(),
        })
    }

    /// Resolve a Stripe price id to a plan tier.
    pub fn plan_for_price(&self, price_id: &str) -> Option<Plan> {
        if self.price_pro.as_deref() == Some(price_id) {
            return Some(Plan::Pro);
        }
        if self.price_business.as_deref() == Some(price_id) {
            return Some(Plan::Business);
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

/// Map Stripe's subscription status vocabulary onto the local enum.
pub fn map_stripe_status(stripe_status: &str) -> &'static str {
    match stripe_status {
        "active" | "trialing" => SUB_ACTIVE,
        "past_due" => SUB_PAST_DUE,
        "canceled" | "unpaid" | "incomplete_expired" => SUB_CANCELED,
        "incomplete" => SUB_INCOMPLETE,
        "paused" => SUB_PAUSED,
        other => {
            tracing::warn!(stripe_status = other, "Unknown Stripe status, treating as incomplete");
            SUB_INCOMPLETE
        }
    }
}

fn period_end_from_unix(unix: Option<i64>) -> Option<DateTime<Utc>> {
    unix.and_then(|t| DateTime::from_timestamp(t, 0))
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// What happened to a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event was applied.
    Processed,
    /// The event id was seen before; nothing was written.
    Duplicate,
    /// The event type is not consumed by this system.
    Ignored,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed event payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Stripe API error: {0}")]
    Client(#[from] ClientError),
}

/// Applies verified Stripe events to the local database and publishes the
/// resulting domain events.
pub struct WebhookProcessor {
    pool: DbPool,
    bus: Arc<EventBus>,
    config: BillingConfig,
    client: Option<BillingClient>,
}

impl WebhookProcessor {
    pub fn new(pool: DbPool, bus: Arc<EventBus>, config: BillingConfig) -> Self {
        let client = config
            .api_key
            .as_ref()
            .map(|key| BillingClient::new(key.clone()));
        Self {
            pool,
            bus,
            config,
            client,
        }
    }

    /// Replace the API client. Used by tests to point at a stub server.
    pub fn with_client(mut self, client: Option<BillingClient>) -> Self {
        self.client = client;
        self
    }

    /// Process one verified event end-to-end.
    pub async fn process(&self, event: &StripeEvent) -> Result<Outcome, ProcessError> {
        let fresh =
            SubscriptionRepo::record_stripe_event(&self.pool, &event.id, &event.event_type)
                .await?;
        if !fresh {
            tracing::info!(event_id = %event.id, "Duplicate Stripe event, skipping");
            return Ok(Outcome::Duplicate);
        }

        match event.event_type.as_str() {
            stripe_types::CHECKOUT_SESSION_COMPLETED => {
                let session: CheckoutSession = serde_json::from_value(event.data.object.clone())?;
                self.handle_checkout_completed(session).await
            }
            stripe_types::SUBSCRIPTION_UPDATED => {
                let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())?;
                self.handle_subscription_updated(sub).await
            }
            stripe_types::SUBSCRIPTION_DELETED => {
                let sub: StripeSubscription = serde_json::from_value(event.data.object.clone())?;
                self.handle_subscription_deleted(sub).await
            }
            stripe_types::INVOICE_PAYMENT_FAILED => {
                let invoice: Invoice = serde_json::from_value(event.data.object.clone())?;
                self.handle_payment_failed(invoice).await
            }
            other => {
                tracing::debug!(event_type = other, "Unhandled Stripe event type");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// `checkout.session.completed`: link the company to its Stripe
    /// customer/subscription and activate the purchased plan.
    async fn handle_checkout_completed(
        &self,
        session: CheckoutSession,
    ) -> Result<Outcome, ProcessError> {
        let Some(company_id) = session
            .client_reference_id
            .as_deref()
            .and_then(|s| s.parse::<DbId>().ok())
        else {
            tracing::warn!("checkout.session.completed without usable client_reference_id");
            return Ok(Outcome::Ignored);
        };
        let (Some(customer), Some(subscription_id)) = (&session.customer, &session.subscription)
        else {
            tracing::warn!(company_id, "Checkout session missing customer or subscription");
            return Ok(Outcome::Ignored);
        };

        let (plan, period_end) = self
            .resolve_checkout_plan(&session, subscription_id)
            .await?;

        SubscriptionRepo::activate(
            &self.pool,
            company_id,
            customer,
            subscription_id,
            plan.as_str(),
            period_end,
        )
        .await?;

        self.rotate_usage_period(company_id, plan).await?;

        tracing::info!(company_id, plan = plan.as_str(), "Subscription activated");
        Ok(Outcome::Processed)
    }

    /// Plan resolution order: session metadata (stamped at checkout
    /// creation), then a subscription fetch to read the price id. Sessions
    /// created before the metadata stamp existed fall back to Pro.
    async fn resolve_checkout_plan(
        &self,
        session: &CheckoutSession,
        subscription_id: &str,
    ) -> Result<(Plan, Option<DateTime<Utc>>), ProcessError> {
        if let Some(plan) = session.metadata.plan.as_deref().and_then(Plan::parse) {
            return Ok((plan, None));
        }

        if let Some(client) = &self.client {
            let sub = client.fetch_subscription(subscription_id).await?;
            let plan = sub
                .price_id()
                .and_then(|p| self.config.plan_for_price(p))
                .unwrap_or(Plan::Pro);
            return Ok((plan, period_end_from_unix(sub.current_period_end)));
        }

        tracing::warn!(subscription_id, "No plan metadata and no API client, assuming pro");
        Ok((Plan::Pro, None))
    }

    /// `customer.subscription.updated`: map status, refresh plan and period.
    async fn handle_subscription_updated(
        &self,
        sub: StripeSubscription,
    ) -> Result<Outcome, ProcessError> {
        let status = map_stripe_status(&sub.status);
        let plan = sub.price_id().and_then(|p| self.config.plan_for_price(p));

        let updated = SubscriptionRepo::apply_update(
            &self.pool,
            &sub.id,
            plan.map(Plan::as_str),
            status,
            period_end_from_unix(sub.current_period_end),
            sub.cancel_at_period_end,
        )
        .await?;

        match updated {
            Some(local) => {
                if let Some(plan) = plan {
                    self.rotate_usage_period(local.company_id, plan).await?;
                }
                tracing::info!(
                    company_id = local.company_id,
                    status,
                    "Subscription updated"
                );
                Ok(Outcome::Processed)
            }
            None => {
                tracing::warn!(stripe_subscription_id = %sub.id, "Update for unknown subscription");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// `customer.subscription.deleted`: cancel, downgrade to free, archive
    /// surveys over the free ceiling, and re-key the usage period — all in
    /// one repository transaction.
    async fn handle_subscription_deleted(
        &self,
        sub: StripeSubscription,
    ) -> Result<Outcome, ProcessError> {
        let canceled = SubscriptionRepo::cancel_and_downgrade(
            &self.pool,
            &sub.id,
            Plan::Free.max_active_surveys(),
        )
        .await?;

        match canceled {
            Some(local) => {
                self.bus.publish(
                    DomainEvent::new(event_types::BILLING_SUBSCRIPTION_CANCELED)
                        .with_company(local.company_id)
                        .with_source("subscription", local.id),
                );
                tracing::info!(company_id = local.company_id, "Subscription canceled");
                Ok(Outcome::Processed)
            }
            None => {
                tracing::warn!(stripe_subscription_id = %sub.id, "Delete for unknown subscription");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// `invoice.payment_failed`: flag the subscription and notify admins.
    async fn handle_payment_failed(&self, invoice: Invoice) -> Result<Outcome, ProcessError> {
        let flagged = SubscriptionRepo::mark_past_due(&self.pool, &invoice.customer).await?;

        match flagged {
            Some(local) => {
                self.bus.publish(
                    DomainEvent::new(event_types::BILLING_PAYMENT_FAILED)
                        .with_company(local.company_id)
                        .with_source("subscription", local.id)
                        .with_payload(serde_json::json!({
                            "attempt_count": invoice.attempt_count,
                        })),
                );
                tracing::info!(company_id = local.company_id, "Payment failed, marked past_due");
                Ok(Outcome::Processed)
            }
            None => {
                tracing::warn!(stripe_customer_id = %invoice.customer, "Invoice for unknown customer");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Close the open usage period when the plan changed and open a fresh
    /// one under the new plan.
    async fn rotate_usage_period(&self, company_id: DbId, plan: Plan) -> Result<(), ProcessError> {
        if let Some(open) = UsageRepo::find_open(&self.pool, company_id).await? {
            if open.plan == plan.as_str() {
                return Ok(());
            }
            UsageRepo::close_open(&self.pool, company_id).await?;
        }
        UsageRepo::open_period(&self.pool, company_id, plan.as_str()).await?;
        Ok(())
    }
}
