use chrono::{DateTime, Utc};
use std::time::Duration;

/// Whether the chain's latest block is older than `threshold`.
/// A zero threshold disables the check.
pub fn is_stalled(latest_block_time: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    if threshold.is_zero() {
        return false;
    }
    match chrono::Duration::from_std(threshold) {
        Ok(threshold) => now - latest_block_time > threshold,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn zero_threshold_never_stalls() {
        assert!(!is_stalled(at(0), at(59), Duration::ZERO));
    }

    #[test]
    fn stalls_only_past_the_threshold() {
        let threshold = Duration::from_secs(30 * 60);
        assert!(!is_stalled(at(0), at(30), threshold));
        assert!(is_stalled(at(0), at(31), threshold));
    }

    #[test]
    fn block_from_the_future_is_not_stalled() {
        assert!(!is_stalled(at(10), at(0), Duration::from_secs(60)));
    }
}
