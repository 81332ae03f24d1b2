//! Request extractors for authentication and tenant scoping.

pub mod auth;
pub mod scope;
