//! Requests-per-minute token bucket gating when calls may start.

use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterSnapshot {
    pub capacity: usize,
    pub available: usize,
    pub refill_interval: Duration,
}

/// Token-bucket gate on call initiation.
///
/// - Starts full: up to `requests_per_minute` acquisitions go through at once
/// - A background task adds one token every `60s / requests_per_minute`
/// - Refill ticks that find the bucket full are dropped, never banked
///
/// Must be created inside a Tokio runtime. The refill task stops when the
/// limiter is dropped.
pub struct RateLimiter {
    tokens: Arc<Semaphore>,
    capacity: usize,
    refill_interval: Duration,
    refill_task: JoinHandle<()>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Result<Self> {
        if requests_per_minute == 0 {
            return Err(Error::configuration_with_context(
                "rate limiter capacity must be at least 1",
                ErrorContext::new()
                    .with_field_path("rate_limit.requests_per_minute")
                    .with_source("rate_limiter"),
            ));
        }

        let capacity = requests_per_minute as usize;
        let refill_interval = Duration::from_secs(60) / requests_per_minute;
        let tokens = Arc::new(Semaphore::new(capacity));
        let refill_task = tokio::spawn(refill(tokens.clone(), capacity, refill_interval));

        info!(
            requests_per_minute,
            refill_interval_ms = refill_interval.as_millis() as u64,
            "rate limiter initialized"
        );

        Ok(Self {
            tokens,
            capacity,
            refill_interval,
            refill_task,
        })
    }

    /// Wait for a token and consume it.
    ///
    /// Never errors and never times out; callers that need cancellation race
    /// this future against their own signal. Dropping the future before it
    /// completes does not consume a token.
    pub async fn acquire(&self) {
        if let Ok(permit) = self.tokens.acquire().await {
            permit.forget();
        }
    }

    /// Consume a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        match self.tokens.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        RateLimiterSnapshot {
            capacity: self.capacity,
            available: self.available(),
            refill_interval: self.refill_interval,
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.refill_task.abort();
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .field("refill_interval", &self.refill_interval)
            .finish()
    }
}

async fn refill(tokens: Arc<Semaphore>, capacity: usize, every: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        // Only this task adds permits, so the check cannot race into overflow.
        if tokens.available_permits() < capacity {
            tokens.add_permits(1);
        }
    }
}
