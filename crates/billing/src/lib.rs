//! Stripe billing integration.
//!
//! Three layers, from the wire inward:
//!
//! - [`signature`] — `Stripe-Signature` header verification (HMAC-SHA256
//!   with a replay-tolerance window), applied to the raw body before any
//!   parsing.
//! - [`event`] — the typed subset of Stripe's event schema this system
//!   consumes.
//! - [`processor`] — translates verified events into local subscription,
//!   survey, and usage-tracking writes; idempotent via the
//!   `stripe_events` ledger.
//!
//! [`client`] is a thin read-only Stripe API client used to resolve
//! details a webhook payload does not carry.

pub mod client;
pub mod event;
pub mod processor;
pub mod signature;

pub use client::BillingClient;
pub use event::StripeEvent;
pub use processor::{BillingConfig, WebhookProcessor};
pub use signature::verify_signature;
