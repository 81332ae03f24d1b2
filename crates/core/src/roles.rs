//! Well-known company role name constants.
//!
//! These must match the CHECK constraint on `company_members.role` in
//! `20260301000002_create_companies.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_MEMBER: &str = "member";

/// Whether `role` may approve or reject daily reports.
pub fn can_approve(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_MANAGER
}

/// Whether `role` may manage company settings, members, and billing.
pub fn can_administer(role: &str) -> bool {
    role == ROLE_ADMIN
}
