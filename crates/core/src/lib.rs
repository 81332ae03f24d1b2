//! Domain core for the Canteiro construction-site management platform.
//!
//! Framework-free building blocks shared by every other crate: error and id
//! types, company role constants, plan limits, pagination clamps, the QR
//! pairing state machine, and the inbox reply-suggestion engine.

pub mod error;
pub mod pagination;
pub mod pairing;
pub mod plan;
pub mod roles;
pub mod suggest;
pub mod types;
