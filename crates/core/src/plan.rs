//! Subscription plan tiers and their resource ceilings.
//!
//! The ceilings are enforced at creation time (projects, survey activation,
//! attachment upload), not retroactively: a downgrade leaves existing rows
//! in place except for active surveys, which the billing processor archives
//! down to the new ceiling.

use serde::{Deserialize, Serialize};

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Pro,
    Business,
}

impl Plan {
    /// Parse from the wire/database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            "business" => Some(Plan::Business),
            _ => None,
        }
    }

    /// Database/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Business => "business",
        }
    }

    /// Maximum number of non-deleted projects, `None` = unlimited.
    pub fn max_projects(self) -> Option<i64> {
        match self {
            Plan::Free => Some(3),
            Plan::Pro => Some(25),
            Plan::Business => None,
        }
    }

    /// Maximum number of active surveys, `None` = unlimited.
    pub fn max_active_surveys(self) -> Option<i64> {
        match self {
            Plan::Free => Some(2),
            Plan::Pro => Some(20),
            Plan::Business => None,
        }
    }

    /// Total attachment storage ceiling in bytes, `None` = unlimited.
    pub fn max_storage_bytes(self) -> Option<i64> {
        match self {
            Plan::Free => Some(512 * 1024 * 1024),
            Plan::Pro => Some(50 * 1024 * 1024 * 1024),
            Plan::Business => None,
        }
    }
}

/// Check a proposed resource count against a plan ceiling.
///
/// Returns `true` when `current + 1` still fits under the plan's limit.
pub fn within_limit(limit: Option<i64>, current: i64) -> bool {
    match limit {
        Some(max) => current < max,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        for plan in [Plan::Free, Plan::Pro, Plan::Business] {
            assert_eq!(Plan::parse(plan.as_str()), Some(plan));
        }
        assert_eq!(Plan::parse("enterprise"), None);
    }

    #[test]
    fn free_plan_caps_projects_at_three() {
        let limit = Plan::Free.max_projects();
        assert!(within_limit(limit, 2));
        assert!(!within_limit(limit, 3));
    }

    #[test]
    fn business_plan_is_unlimited() {
        assert!(within_limit(Plan::Business.max_projects(), i64::MAX - 1));
        assert!(within_limit(Plan::Business.max_storage_bytes(), i64::MAX - 1));
    }
}
