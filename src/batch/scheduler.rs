//! Batch scheduler: fixed-size batches, a bounded worker pool and ordered results.

use super::executor::ItemExecutor;
use super::outcome::Outcome;
use super::report::ResultSummary;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::info;

/// Splits input into consecutive batches and drives each through a shared
/// worker pool of `max_concurrent` slots.
///
/// Batch N+1 does not start until every item of batch N is terminal. The
/// returned outcomes are aligned with the input: `outcomes[i].index == i`.
pub struct BatchScheduler {
    executor: Arc<ItemExecutor>,
    batch_size: usize,
    max_concurrent: usize,
    pool: Arc<Semaphore>,
    show_progress: bool,
}

impl BatchScheduler {
    pub fn new(executor: Arc<ItemExecutor>, batch_size: usize, max_concurrent: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::configuration_with_context(
                "batch size must be at least 1",
                ErrorContext::new().with_field_path("batch.size"),
            ));
        }
        if max_concurrent == 0 {
            return Err(Error::configuration_with_context(
                "max concurrency must be at least 1",
                ErrorContext::new().with_field_path("batch.max_concurrent"),
            ));
        }
        Ok(Self {
            executor,
            batch_size,
            max_concurrent,
            pool: Arc::new(Semaphore::new(max_concurrent)),
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Worker slots not currently held by an item.
    pub fn available_slots(&self) -> usize {
        self.pool.available_permits()
    }

    pub fn executor(&self) -> &Arc<ItemExecutor> {
        &self.executor
    }

    /// Run every item to a terminal outcome, recording usage under `label`.
    ///
    /// Per-item failures are values inside the returned outcomes. An `Err`
    /// means the run itself broke (a worker panicked or an outcome went missing).
    pub async fn run<T, R>(&self, label: &str, items: Vec<T>, render: R) -> Result<Vec<Outcome>>
    where
        T: Send + Sync + 'static,
        R: Fn(&T) -> String + Send + Sync + 'static,
    {
        let total = items.len();
        if total == 0 {
            info!("no items to process");
            return Ok(Vec::new());
        }

        let total_batches = total.div_ceil(self.batch_size);
        info!(
            total_items = total,
            batch_size = self.batch_size,
            max_concurrent = self.max_concurrent,
            total_batches,
            "starting batch processing"
        );

        let started = Instant::now();
        let render = Arc::new(render);
        let label: Arc<str> = Arc::from(label);
        let mut slots: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();
        let mut processed = 0usize;
        let mut items = items.into_iter().enumerate().peekable();
        let mut batch_num = 0usize;

        while items.peek().is_some() {
            batch_num += 1;
            let batch: Vec<(usize, T)> = items.by_ref().take(self.batch_size).collect();
            let first = batch.first().map(|(i, _)| *i).unwrap_or_default();
            let last = batch.last().map(|(i, _)| *i).unwrap_or_default();
            info!(
                batch_num,
                total_batches,
                batch_start = first + 1,
                batch_end = last + 1,
                batch_items = batch.len(),
                "processing batch"
            );

            let mut tasks = JoinSet::new();
            for (index, item) in batch {
                let executor = Arc::clone(&self.executor);
                let pool = Arc::clone(&self.pool);
                let render = Arc::clone(&render);
                let label = Arc::clone(&label);
                tasks.spawn(async move {
                    let cancel = executor.cancel_token().clone();
                    let _permit = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Outcome::cancelled(index),
                        permit = pool.acquire_owned() => match permit {
                            Ok(p) => p,
                            // the pool is never closed while the scheduler is alive
                            Err(_) => return Outcome::cancelled(index),
                        },
                    };
                    if cancel.is_cancelled() {
                        return Outcome::cancelled(index);
                    }
                    executor.run(index, &item, render.as_ref(), &label).await
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let outcome = joined.map_err(|e| {
                    Error::runtime_with_context(
                        format!("worker task failed: {}", e),
                        ErrorContext::new().with_source("batch_scheduler"),
                    )
                })?;
                processed += 1;
                if self.show_progress {
                    info!(
                        processed,
                        total,
                        progress = %format!("{:.1}%", processed as f64 * 100.0 / total as f64),
                        "progress update"
                    );
                }
                let index = outcome.index;
                match slots.get_mut(index) {
                    Some(slot) => *slot = Some(outcome),
                    None => {
                        return Err(Error::runtime_with_context(
                            format!("outcome index {} out of range", index),
                            ErrorContext::new().with_source("batch_scheduler"),
                        ))
                    }
                }
            }

            info!(batch_num, items_completed = last + 1, "batch completed");
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    Error::runtime_with_context(
                        format!("no outcome recorded for item {}", i),
                        ErrorContext::new().with_source("batch_scheduler"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let summary = ResultSummary::from_outcomes(&outcomes);
        info!(
            total_items = summary.total_items,
            successful = summary.success_count,
            failed = summary.failure_count,
            cancelled = summary.cancelled_count,
            success_rate = %format!("{:.1}%", summary.success_rate * 100.0),
            total_retries = summary.total_retries,
            total_tokens = summary.total_tokens,
            wall_time_ms = started.elapsed().as_millis() as u64,
            avg_per_item_ms = summary.average_duration.as_millis() as u64,
            "batch processing completed"
        );

        Ok(outcomes)
    }
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("batch_size", &self.batch_size)
            .field("max_concurrent", &self.max_concurrent)
            .field("show_progress", &self.show_progress)
            .finish()
    }
}
