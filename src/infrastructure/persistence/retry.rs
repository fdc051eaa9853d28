//! Backoff policy for re-running transactions that lost a contention race.

use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Upper bound for a single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(1);

/// Bounded exponential backoff with jitter.
///
/// Delays start at `base_delay` and double per attempt, capped at one second.
/// `max_retries` counts extra attempts, so a transaction runs at most
/// `max_retries + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Sleep durations before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + Send + use<> {
        // ExponentialBackoff yields factor * 2^n for n >= 1.
        let factor = (self.base_delay.as_millis() as u64 / 2).max(1);

        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(MAX_DELAY)
            .map(jitter)
            .take(self.max_retries)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(10))
    }
}
