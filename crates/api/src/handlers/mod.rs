//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource family.
//! Handlers authenticate via [`crate::middleware::auth::AuthUser`] or the
//! tenant-scoping [`crate::middleware::scope::CompanyScope`], delegate to
//! the repositories in `canteiro_db`, publish domain events, and map errors
//! via [`crate::error::AppError`].

pub mod attachment;
pub mod auth;
pub mod billing;
pub mod comment;
pub mod company;
pub mod inbox;
pub mod incident;
pub mod notification;
pub mod pairing;
pub mod project;
pub mod rdo;
pub mod survey;
