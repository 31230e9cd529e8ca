use crate::batch::{BatchScheduler, ItemExecutor, ResultReporter};
use crate::config::ProcessorConfig;
use crate::processor::core::BatchProcessor;
use crate::resilience::RateLimiter;
use crate::tokens::UsageTracker;
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Builder for [`BatchProcessor`].
///
/// Everything not supplied explicitly is derived from the [`ProcessorConfig`]:
/// an [`HttpTransport`] for `model`, a fresh [`UsageTracker`] when
/// `monitoring.track_usage` is on, and a new cancellation token.
pub struct BatchProcessorBuilder {
    config: ProcessorConfig,
    transport: Option<Arc<dyn Transport>>,
    usage_tracker: Option<Arc<UsageTracker>>,
    cancel: Option<CancellationToken>,
    reporter: ResultReporter,
}

impl BatchProcessorBuilder {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            config,
            transport: None,
            usage_tracker: None,
            cancel: None,
            reporter: ResultReporter::new(),
        }
    }

    /// Use a custom transport instead of HTTP (tests, alternative backends).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Share a tracker across processors or runs. Records even when
    /// `monitoring.track_usage` is off.
    pub fn usage_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.usage_tracker = Some(tracker);
        self
    }

    /// Tie the processor to an externally owned cancellation token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn reporter(mut self, reporter: ResultReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Validate the configuration and assemble the processor.
    ///
    /// Must be called from within a Tokio runtime: the rate limiter starts its
    /// refill task here.
    pub fn build(self) -> Result<BatchProcessor> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&config.model)?),
        };
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.requests_per_minute)?);
        let cancel = self.cancel.unwrap_or_default();
        let usage = self.usage_tracker.or_else(|| {
            config
                .monitoring
                .track_usage
                .then(|| Arc::new(UsageTracker::new(&config.model.name)))
        });

        let mut executor = ItemExecutor::new(
            transport,
            Arc::clone(&limiter),
            config.retry.policy(),
            config.retry.max_retries,
            cancel.clone(),
        )
        .with_system_message(config.model.system_message());
        if let Some(tracker) = &usage {
            executor = executor.with_usage_tracker(Arc::clone(tracker));
        }

        let scheduler = BatchScheduler::new(
            Arc::new(executor),
            config.batch.size,
            config.batch.max_concurrent,
        )?
        .with_progress(config.monitoring.show_progress);

        info!(
            model = config.model.name.as_str(),
            batch_size = config.batch.size,
            max_concurrent = config.batch.max_concurrent,
            requests_per_minute = config.rate_limit.requests_per_minute,
            max_retries = config.retry.max_retries,
            track_usage = usage.is_some(),
            "batch processor initialized"
        );

        Ok(BatchProcessor {
            config,
            limiter,
            scheduler,
            usage,
            reporter: self.reporter,
            cancel,
        })
    }
}
