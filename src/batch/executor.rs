//! Single-item executor: rate limiting, transport call and retry loop.

use super::outcome::{ItemFailure, Outcome};
use crate::config::DEFAULT_SYSTEM_MESSAGE;
use crate::logging::truncate_error;
use crate::resilience::{RateLimiter, RetryPolicy};
use crate::tokens::UsageTracker;
use crate::transport::Transport;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Drives one work item to a terminal [`Outcome`].
///
/// Attempts for one item are strictly sequential. Cancellation is observed
/// before each attempt, while waiting for a rate-limiter token, during the
/// transport call and during backoff. Usage is recorded only on success.
pub struct ItemExecutor {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    max_retries: u32,
    tracker: Option<Arc<UsageTracker>>,
    cancel: CancellationToken,
    system_message: String,
}

impl ItemExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
        max_retries: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            limiter,
            policy,
            max_retries,
            tracker: None,
            cancel,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
        }
    }

    pub fn with_usage_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Render `item` and run it with the default system message.
    ///
    /// The prompt is rendered once, before any token is taken: an empty
    /// render is a validation failure that costs neither a token nor a retry.
    pub async fn run<T, R>(&self, index: usize, item: &T, render: &R, label: &str) -> Outcome
    where
        R: Fn(&T) -> String + ?Sized,
    {
        let start = Instant::now();
        if self.cancel.is_cancelled() {
            return self.cancelled(index, 0, start);
        }
        let prompt = render(item);
        self.execute_from(index, &prompt, &self.system_message, label, start)
            .await
    }

    /// Run an already-rendered prompt, optionally with a different system message.
    pub async fn execute(
        &self,
        index: usize,
        prompt: &str,
        system_message: Option<&str>,
        label: &str,
    ) -> Outcome {
        let start = Instant::now();
        if self.cancel.is_cancelled() {
            return self.cancelled(index, 0, start);
        }
        let system = system_message.unwrap_or(&self.system_message);
        self.execute_from(index, prompt, system, label, start).await
    }

    async fn execute_from(
        &self,
        index: usize,
        prompt: &str,
        system_message: &str,
        label: &str,
        start: Instant,
    ) -> Outcome {
        if prompt.is_empty() {
            warn!(index, "empty prompt generated, skipping request");
            return Outcome::failure(index, ItemFailure::empty_prompt(), 0, start.elapsed());
        }

        let mut retries: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(index, retries, start);
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(index, retries, start),
                _ = self.limiter.acquire() => {}
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(index, retries, start),
                r = self.transport.call(prompt, system_message) => r,
            };

            let err = match result {
                Ok(completion) => {
                    let duration = start.elapsed();
                    if let Some(tracker) = &self.tracker {
                        tracker.record_usage(label, &completion.usage);
                    }
                    info!(
                        index,
                        retries,
                        duration_ms = duration.as_millis() as u64,
                        tokens = completion.usage.total_tokens,
                        "item processed successfully"
                    );
                    return Outcome::success(index, completion, retries, duration);
                }
                Err(err) => err,
            };

            if retries >= self.max_retries {
                let duration = start.elapsed();
                error!(
                    index,
                    retries,
                    duration_ms = duration.as_millis() as u64,
                    error_class = err.class(),
                    error = %truncate_error(&err.to_string()),
                    "item processing failed after all retries"
                );
                return Outcome::failure(
                    index,
                    ItemFailure::RetryExhausted {
                        attempts: retries + 1,
                        last: err,
                    },
                    retries,
                    duration,
                );
            }

            retries += 1;
            let delay = self.policy.delay(retries - 1);
            warn!(
                index,
                attempt = retries,
                max_attempts = self.max_retries + 1,
                elapsed_ms = start.elapsed().as_millis() as u64,
                retry_in_ms = delay.as_millis() as u64,
                error_class = err.class(),
                error = %truncate_error(&err.to_string()),
                "request failed, retrying"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(index, retries, start),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn cancelled(&self, index: usize, retries: u32, start: Instant) -> Outcome {
        info!(index, retries, "item cancelled");
        Outcome::failure(index, ItemFailure::Cancelled, retries, start.elapsed())
    }
}

impl std::fmt::Debug for ItemExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemExecutor")
            .field("policy", &self.policy)
            .field("max_retries", &self.max_retries)
            .field("tracks_usage", &self.tracker.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
