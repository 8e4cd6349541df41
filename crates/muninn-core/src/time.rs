use chrono::{DateTime, Utc};

/// Current time. Centralized so call sites never reach for `Utc::now()`
/// directly — keeps every timestamp in the system testable by construction
/// (tests pass explicit `DateTime<Utc>` values instead).
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fractional days elapsed between `since` and `at`, floored at 0.0 so a
/// clock skew or future timestamp never produces a negative decay exponent
/// (spec.md §4.5 "Effective confidence", §4.7 temperature decay).
pub fn days_since(since: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    let seconds = (at - since).num_seconds() as f64;
    (seconds / 86_400.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_days_since_basic() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::days(3);
        assert!((days_since(t0, t1) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_days_since_floors_at_zero() {
        let t0 = Utc::now();
        let t1 = t0 - Duration::days(3);
        assert_eq!(days_since(t0, t1), 0.0);
    }

    #[test]
    fn test_days_since_fractional() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(12);
        assert!((days_since(t0, t1) - 0.5).abs() < 1e-9);
    }
}
