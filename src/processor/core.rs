use crate::batch::{BatchScheduler, Outcome, ResultReporter};
use crate::config::ProcessorConfig;
use crate::processor::builder::BatchProcessorBuilder;
use crate::processor::signals::{InflightSnapshot, SignalsSnapshot};
use crate::resilience::RateLimiter;
use crate::tokens::UsageTracker;
use crate::{Error, ErrorContext, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Rate-limited, bounded-concurrency batch runner for chat-completion calls.
///
/// One processor owns one rate limiter and one worker pool; both are shared
/// by every run started through it, so concurrent runs on the same processor
/// still respect the configured limits together.
pub struct BatchProcessor {
    pub(crate) config: ProcessorConfig,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) scheduler: BatchScheduler,
    pub(crate) usage: Option<Arc<UsageTracker>>,
    pub(crate) reporter: ResultReporter,
    pub(crate) cancel: CancellationToken,
}

impl BatchProcessor {
    /// Build a processor from `config` with default collaborators.
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        BatchProcessorBuilder::new(config).build()
    }

    pub fn builder(config: ProcessorConfig) -> BatchProcessorBuilder {
        BatchProcessorBuilder::new(config)
    }

    /// Run `items` through the scheduler, recording usage under `label`.
    ///
    /// Returns one outcome per item in input order. Per-item failures are
    /// inside the outcomes; `Err` means the run itself could not complete.
    pub async fn process_batch<T, R>(
        &self,
        label: &str,
        items: Vec<T>,
        render: R,
    ) -> Result<Vec<Outcome>>
    where
        T: Send + Sync + 'static,
        R: Fn(&T) -> String + Send + Sync + 'static,
    {
        let start = Instant::now();
        let outcomes = self.scheduler.run(label, items, render).await?;
        if self.config.monitoring.track_timing {
            info!(
                label,
                items = outcomes.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "batch run finished"
            );
        }
        Ok(outcomes)
    }

    /// Run items produced by an async loader.
    ///
    /// A loader failure aborts the run before any request is made.
    pub async fn process_from<T, R, F, Fut>(
        &self,
        label: &str,
        load: F,
        render: R,
    ) -> Result<Vec<Outcome>>
    where
        T: Send + Sync + 'static,
        R: Fn(&T) -> String + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let items = match load().await {
            Ok(items) => items,
            Err(e) => {
                error!(label, error = %e, "failed to load items");
                return Err(Error::runtime_with_context(
                    format!("failed to load items for '{}'", label),
                    ErrorContext::new()
                        .with_details(e.to_string())
                        .with_source("item_source"),
                ));
            }
        };
        info!(label, items = items.len(), "items loaded");
        self.process_batch(label, items, render).await
    }

    /// Run one prompt through the same limiter, retry policy and tracker.
    ///
    /// `system_message` overrides the configured one for this call only.
    /// Does not take a worker-pool slot.
    pub async fn process_single(
        &self,
        label: &str,
        prompt: &str,
        system_message: Option<&str>,
    ) -> Outcome {
        let outcome = self
            .scheduler
            .executor()
            .execute(0, prompt, system_message, label)
            .await;
        if self.config.monitoring.track_timing {
            info!(
                label,
                success = outcome.is_success(),
                retries = outcome.retries,
                duration_ms = outcome.duration.as_millis() as u64,
                "single prompt processed"
            );
        }
        outcome
    }

    /// Results table for `outcomes`.
    pub fn report(&self, outcomes: &[Outcome]) -> String {
        self.reporter.render(outcomes)
    }

    pub fn log_report(&self, outcomes: &[Outcome]) {
        self.reporter.log_results(outcomes);
    }

    pub fn reporter(&self) -> &ResultReporter {
        &self.reporter
    }

    pub fn usage_tracker(&self) -> Option<&Arc<UsageTracker>> {
        self.usage.as_ref()
    }

    /// Token/cost report, or `None` when usage tracking is off.
    pub fn usage_report(&self) -> Option<String> {
        self.usage.as_ref().map(|t| t.report())
    }

    /// Clone of the token that stops this processor's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop all outstanding and future work on this processor.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn signals(&self) -> SignalsSnapshot {
        SignalsSnapshot {
            inflight: InflightSnapshot::new(
                self.scheduler.max_concurrent(),
                self.scheduler.available_slots(),
            ),
            rate_limiter: self.limiter.snapshot(),
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("model", &self.config.model.name)
            .field("scheduler", &self.scheduler)
            .field("limiter", &self.limiter)
            .field("tracks_usage", &self.usage.is_some())
            .finish()
    }
}
