//! Retry backoff policy.

use std::time::Duration;

/// Deterministic backoff schedule.
///
/// `attempt` is 0 for the wait that precedes the first retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential: bool,
}

impl RetryPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, exponential: bool) -> Self {
        Self {
            initial_delay,
            max_delay,
            exponential,
        }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay, false)
    }

    /// `initial_delay` when backoff is off, otherwise `min(initial_delay * 2^attempt, max_delay)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.initial_delay;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(Duration::MAX)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(10), true)
    }
}
