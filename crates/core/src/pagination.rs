//! Pagination clamping helpers shared by all list repositories.

/// Clamp an optional `limit` query parameter to `[1, max]`, falling back to
/// `default` when absent or non-positive.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    match limit {
        Some(l) if l >= 1 => l.min(max),
        _ => default,
    }
}

/// Clamp an optional `offset` query parameter to be non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_when_absent() {
        assert_eq!(clamp_limit(None, 50, 200), 50);
    }

    #[test]
    fn limit_clamps_to_max() {
        assert_eq!(clamp_limit(Some(10_000), 50, 200), 200);
    }

    #[test]
    fn non_positive_limit_falls_back_to_default() {
        assert_eq!(clamp_limit(Some(0), 50, 200), 50);
        assert_eq!(clamp_limit(Some(-5), 50, 200), 50);
    }

    #[test]
    fn offset_never_negative() {
        assert_eq!(clamp_offset(Some(-1)), 0);
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some(30)), 30);
    }
}
