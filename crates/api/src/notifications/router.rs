//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the domain event bus and, for each
//! event carrying a company id, materialises notification rows for the
//! affected members and pushes them over their WebSocket connections.
//! Billing failures additionally go out by email to company admins when
//! SMTP is configured.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes};
use canteiro_core::types::DbId;
use canteiro_db::repositories::{CompanyRepo, NotificationRepo, UserRepo};
use canteiro_db::DbPool;
use canteiro_events::bus::event_types;
use canteiro_events::{DomainEvent, EmailDelivery};
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Routes domain events to user notifications.
pub struct NotificationRouter {
    pool: DbPool,
    ws_manager: Arc<WsManager>,
    email: Option<EmailDelivery>,
}

impl NotificationRouter {
    pub fn new(pool: DbPool, ws_manager: Arc<WsManager>, email: Option<EmailDelivery>) -> Self {
        Self {
            pool,
            ws_manager,
            email,
        }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](canteiro_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Fan one event out to its audience.
    async fn route_event(&self, event: &DomainEvent) -> Result<(), sqlx::Error> {
        let Some(company_id) = event.company_id else {
            return Ok(());
        };
        let Some((title, body)) = describe(event) else {
            return Ok(());
        };

        let audience = self.audience(event, company_id).await?;

        for user_id in &audience {
            // The actor already knows; don't notify them about their own action.
            if event.actor_user_id == Some(*user_id) {
                continue;
            }

            let notification = NotificationRepo::create(
                &self.pool,
                *user_id,
                Some(company_id),
                &event.event_type,
                &title,
                body.as_deref(),
            )
            .await?;

            let payload = serde_json::json!({
                "type": "notification",
                "notification": notification,
            });
            self.ws_manager
                .send_to_user(*user_id, Message::Text(Utf8Bytes::from(payload.to_string())))
                .await;
        }

        // High-urgency events also go out by email to company admins.
        if matches!(
            event.event_type.as_str(),
            event_types::BILLING_PAYMENT_FAILED | event_types::RDO_SUBMITTED
        ) {
            self.email_admins(company_id, &title, body.as_deref().unwrap_or(""))
                .await?;
        }

        Ok(())
    }

    /// Who gets notified: billing events go to admins, report submissions
    /// to approvers' superset (admins), everything else to all members.
    async fn audience(
        &self,
        event: &DomainEvent,
        company_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        match event.event_type.as_str() {
            event_types::BILLING_PAYMENT_FAILED | event_types::BILLING_SUBSCRIPTION_CANCELED => {
                CompanyRepo::admin_user_ids(&self.pool, company_id).await
            }
            _ => CompanyRepo::member_user_ids(&self.pool, company_id).await,
        }
    }

    async fn email_admins(
        &self,
        company_id: DbId,
        subject: &str,
        body: &str,
    ) -> Result<(), sqlx::Error> {
        let Some(email) = &self.email else {
            return Ok(());
        };

        for user_id in CompanyRepo::admin_user_ids(&self.pool, company_id).await? {
            let Some(user) = UserRepo::find_by_id(&self.pool, user_id).await? else {
                continue;
            };
            if let Err(e) = email.deliver(&user.email, subject, body).await {
                tracing::warn!(error = %e, user_id, "Failed to send notification email");
            }
        }
        Ok(())
    }
}

/// Human-readable title and body for an event, `None` for event types that
/// produce no user-facing notification.
fn describe(event: &DomainEvent) -> Option<(String, Option<String>)> {
    let (title, body) = match event.event_type.as_str() {
        event_types::RDO_SUBMITTED => (
            "Daily report submitted for approval".to_string(),
            event.payload["report_date"]
                .as_str()
                .map(|d| format!("Report for {d} is awaiting review.")),
        ),
        event_types::RDO_APPROVED => ("Daily report approved".to_string(), None),
        event_types::RDO_REJECTED => (
            "Daily report rejected".to_string(),
            event.payload["note"].as_str().map(str::to_string),
        ),
        event_types::INCIDENT_REPORTED => (
            "New incident reported".to_string(),
            event.payload["title"].as_str().map(str::to_string),
        ),
        event_types::INCIDENT_RESOLVED => ("Incident resolved".to_string(), None),
        event_types::COMMENT_ADDED => ("New comment".to_string(), None),
        event_types::INBOX_MESSAGE_RECEIVED => (
            "New inbox message".to_string(),
            event.payload["contact_name"]
                .as_str()
                .map(|name| format!("New message from {name}.")),
        ),
        event_types::BILLING_PAYMENT_FAILED => (
            "Payment failed".to_string(),
            Some("The latest subscription payment failed. Update the payment method to avoid losing access.".to_string()),
        ),
        event_types::BILLING_SUBSCRIPTION_CANCELED => (
            "Subscription canceled".to_string(),
            Some("The company was moved to the free plan.".to_string()),
        ),
        _ => return None,
    };
    Some((title, body))
}
