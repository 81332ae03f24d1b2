//! Canteiro event bus and notification delivery infrastructure.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] — the canonical domain event envelope.
//! - [`EventPersistence`] — background service that durably writes every
//!   event to the `events` table.
//! - [`email`] — SMTP notification delivery.

pub mod bus;
pub mod email;
pub mod persistence;

pub use bus::{DomainEvent, EventBus};
pub use email::{EmailConfig, EmailDelivery};
pub use persistence::EventPersistence;
