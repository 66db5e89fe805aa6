//! Bounded retry with exponential backoff and full jitter.
//!
//! Only transport failures and timeouts are retried; a well-formed upstream
//! rejection is final. The decision lives in
//! [`GenerationResult::is_retryable`](crate::generation::GenerationResult::is_retryable).

use std::time::Duration;

use rand::Rng;

/// Retry knobs for a single logical call.
///
/// `max_retries = 0` disables retrying. The delay before retry `n` (1-based) is
/// drawn uniformly from `0..=min(max_delay, base_delay * 2^(n-1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of additional attempts after the first one.
    pub max_retries: u32,
    /// Backoff unit.
    pub base_delay: Duration,
    /// Upper bound for a single backoff.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total number of attempts (first call included).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Upper bound of the backoff before retry number `retry` (1-based).
    pub fn backoff_cap(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let cap = self.base_delay.saturating_mul(1u32 << exp);
        cap.min(self.max_delay)
    }

    /// Randomized backoff before retry number `retry` (1-based), full jitter.
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let cap_ms = self.backoff_cap(retry).as_millis() as u64;
        if cap_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=cap_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_is_capped() {
        let p = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(p.backoff_cap(1), Duration::from_millis(100));
        assert_eq!(p.backoff_cap(2), Duration::from_millis(200));
        assert_eq!(p.backoff_cap(3), Duration::from_millis(350));
        assert_eq!(p.backoff_cap(30), Duration::from_millis(350));
    }

    #[test]
    fn jitter_stays_within_cap() {
        let p = RetryPolicy::default();
        for retry in 1..=4 {
            for _ in 0..50 {
                assert!(p.jittered_delay(retry) <= p.backoff_cap(retry));
            }
        }
    }

    #[test]
    fn none_means_single_attempt() {
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }
}
