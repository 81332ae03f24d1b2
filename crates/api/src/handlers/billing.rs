//! Billing handlers: the Stripe webhook endpoint and the company-facing
//! subscription/usage reads.
//!
//! The webhook verifies the `Stripe-Signature` header against the raw body
//! before parsing anything, dedupes on the event id, and returns 500 on
//! processing failures so Stripe redelivers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use canteiro_billing::processor::{Outcome, ProcessError};
use canteiro_billing::signature::verify_signature;
use canteiro_billing::StripeEvent;
use canteiro_core::types::{DbId, Timestamp};
use canteiro_db::models::subscription::{Subscription, SUB_ACTIVE};
use canteiro_db::repositories::{SubscriptionRepo, UsageRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::scope::CompanyScope;
use crate::state::AppState;

/// POST /api/v1/billing/webhook
///
/// Consumes raw bytes: signature verification must see exactly what Stripe
/// signed.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<StatusCode> {
    let Some(processor) = &state.billing else {
        tracing::warn!("Webhook received but billing is not configured");
        return Ok(StatusCode::SERVICE_UNAVAILABLE);
    };
    let Some(config) = &state.config.billing else {
        return Ok(StatusCode::SERVICE_UNAVAILABLE);
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".into()))?;

    verify_signature(
        signature,
        &body,
        &config.webhook_secret,
        chrono::Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Webhook signature rejected");
        AppError::BadRequest("Invalid webhook signature".into())
    })?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed event payload: {e}")))?;

    match processor.process(&event).await {
        Ok(outcome) => {
            if outcome == Outcome::Processed {
                tracing::info!(event_id = %event.id, event_type = %event.event_type, "Webhook processed");
            }
            Ok(StatusCode::OK)
        }
        Err(ProcessError::Payload(e)) => {
            Err(AppError::BadRequest(format!("Malformed event payload: {e}")))
        }
        Err(e) => {
            tracing::error!(error = %e, event_id = %event.id, "Webhook processing failed");
            Err(AppError::InternalError("Webhook processing failed".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// Company-facing reads
// ---------------------------------------------------------------------------

/// Subscription view; companies without a subscription row read as free.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub company_id: DbId,
    pub plan: String,
    pub status: String,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
}

impl SubscriptionView {
    fn from_row(sub: Subscription) -> Self {
        Self {
            company_id: sub.company_id,
            plan: sub.plan,
            status: sub.status,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
        }
    }

    fn free(company_id: DbId) -> Self {
        Self {
            company_id,
            plan: "free".into(),
            status: SUB_ACTIVE.into(),
            current_period_end: None,
            cancel_at_period_end: false,
        }
    }
}

/// GET /api/v1/companies/{company_id}/billing/subscription
pub async fn get_subscription(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<Json<SubscriptionView>> {
    scope.require_admin()?;

    let view = SubscriptionRepo::find_by_company(&state.pool, scope.company_id)
        .await?
        .map(SubscriptionView::from_row)
        .unwrap_or_else(|| SubscriptionView::free(scope.company_id));
    Ok(Json(view))
}

/// GET /api/v1/companies/{company_id}/billing/usage
///
/// Opens a free-plan period on first read so new companies always have a
/// usage row, then refreshes the counters from live data.
pub async fn get_usage(
    scope: CompanyScope,
    State(state): State<AppState>,
) -> AppResult<Json<canteiro_db::models::usage::UsagePeriod>> {
    scope.require_admin()?;

    let plan = crate::handlers::project::effective_plan(&state, scope.company_id).await?;
    UsageRepo::open_period(&state.pool, scope.company_id, plan.as_str()).await?;
    UsageRepo::refresh_counters(&state.pool, scope.company_id, 0).await?;

    let usage = UsageRepo::find_open(&state.pool, scope.company_id)
        .await?
        .ok_or_else(|| AppError::InternalError("Usage period vanished".into()))?;
    Ok(Json(usage))
}
