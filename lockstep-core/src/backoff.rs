//! Reconnection backoff policy.
//!
//! Pure computation: the attempt count is always an explicit parameter,
//! never a counter captured from an earlier turn of the event loop.

use std::time::Duration;

/// Default base delay between reconnect attempts.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default upper bound on the reconnect delay.
pub const DEFAULT_CAP_DELAY_MS: u64 = 30_000;

/// Exponential reconnect backoff: `min(base * 2^attempt, cap)`.
///
/// Doubling spreads retries out instead of hammering a flaky transport;
/// the cap bounds worst-case reconnection latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// Create a policy with the given base and cap.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Create a policy from millisecond tuning values.
    pub fn from_millis(base_ms: u64, cap_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms))
    }

    /// Delay before the reconnect following `attempt` prior failures.
    ///
    /// Attempt 0 yields the base delay. Non-decreasing in `attempt` and
    /// bounded above by the cap, overflow included.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(31);
        match 1u32
            .checked_shl(exp)
            .and_then(|factor| self.base.checked_mul(factor))
        {
            Some(delay) => delay.min(self.cap),
            None => self.cap,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_millis(DEFAULT_BASE_DELAY_MS, DEFAULT_CAP_DELAY_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_zero_yields_base_delay() {
        let policy = BackoffPolicy::from_millis(1000, 30_000);
        assert_eq!(policy.delay(0), Duration::from_millis(1000));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = BackoffPolicy::from_millis(1000, 30_000);
        assert_eq!(policy.delay(1), Duration::from_millis(2000));
        assert_eq!(policy.delay(2), Duration::from_millis(4000));
        assert_eq!(policy.delay(3), Duration::from_millis(8000));
    }

    #[test]
    fn delay_is_monotonic_and_capped() {
        let policy = BackoffPolicy::from_millis(1000, 30_000);
        let mut previous = Duration::ZERO;
        for attempt in 0..64 {
            let delay = policy.delay(attempt);
            assert!(delay >= previous, "delay regressed at attempt {}", attempt);
            assert!(delay <= Duration::from_millis(30_000));
            previous = delay;
        }
    }

    #[test]
    fn large_attempt_saturates_at_cap() {
        let policy = BackoffPolicy::from_millis(1000, 30_000);
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn default_matches_tuning_defaults() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(1000));
        assert_eq!(policy.delay(10), Duration::from_millis(30_000));
    }
}
