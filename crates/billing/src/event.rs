//! Typed subset of Stripe's webhook event schema.
//!
//! Only the fields this system reads are modelled; everything else rides
//! along in `serde_json::Value` and is ignored. Deserialization of the
//! envelope never fails on unknown event types — dispatch decides what to
//! do with them.

use serde::Deserialize;

/// Event type strings this system dispatches on.
pub mod event_types {
    pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
    pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
    pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
    pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
}

/// The outer event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    /// Stripe event id (`evt_...`), the idempotency key.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The event's subject object, parsed per-type by the processor.
    pub object: serde_json::Value,
}

/// `checkout.session.completed` subject.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Our company id, set when the checkout session is created.
    pub client_reference_id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionMetadata {
    /// Plan name (`pro` / `business`) stamped onto the session at creation.
    pub plan: Option<String>,
}

/// `customer.subscription.*` subject.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    /// Stripe subscription id (`sub_...`).
    pub id: String,
    pub customer: String,
    /// Stripe's status vocabulary; mapped to the local enum by the
    /// processor.
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    /// Unix timestamp of the current period end.
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    /// Stripe price id (`price_...`), resolved to a plan via configuration.
    pub id: String,
}

/// `invoice.payment_failed` subject.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub customer: String,
    pub attempt_count: Option<i64>,
}

impl StripeSubscription {
    /// The first item's price id, if any. Canteiro subscriptions have
    /// exactly one item.
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subscription_updated_event() {
        let raw = serde_json::json!({
            "id": "evt_123",
            "type": "customer.subscription.updated",
            "data": {
                "object": {
                    "id": "sub_42",
                    "customer": "cus_9",
                    "status": "past_due",
                    "cancel_at_period_end": true,
                    "current_period_end": 1767225600,
                    "items": { "data": [ { "price": { "id": "price_pro" } } ] }
                }
            }
        });

        let event: StripeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.id, "evt_123");
        assert_eq!(event.event_type, event_types::SUBSCRIPTION_UPDATED);

        let sub: StripeSubscription = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(sub.id, "sub_42");
        assert_eq!(sub.status, "past_due");
        assert!(sub.cancel_at_period_end);
        assert_eq!(sub.price_id(), Some("price_pro"));
    }

    #[test]
    fn unknown_event_type_still_parses() {
        let raw = serde_json::json!({
            "id": "evt_1",
            "type": "customer.tax_id.created",
            "data": { "object": {} }
        });
        let event: StripeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.event_type, "customer.tax_id.created");
    }

    #[test]
    fn checkout_session_tolerates_missing_optionals() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(session.client_reference_id.is_none());
        assert!(session.metadata.plan.is_none());
    }
}
