//! 批处理模块：限流、重试与有界并发下的批量模型调用。
//!
//! # Batch Processing Module
//!
//! Turns a sequence of work items into an index-aligned sequence of terminal
//! [`Outcome`]s, one model call (plus retries) per item.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ItemExecutor`] | Runs one item: render, rate-limit, call, retry with backoff |
//! | [`BatchScheduler`] | Fixed-size batches over a bounded worker pool, results in input order |
//! | [`Outcome`] | Terminal per-item record (output or failure, retries, duration) |
//! | [`ItemFailure`] | Validation, cancellation or retry exhaustion |
//! | [`ResultReporter`] | Summary statistics and the per-item results table |
//!
//! ## Guarantees
//!
//! - `outcomes.len() == items.len()` and `outcomes[i].index == i`
//! - at most `max_concurrent` items are in flight at once
//! - batch N+1 starts only after every item of batch N is terminal
//! - `retries <= max_retries` for every outcome
//!
//! ## Example
//!
//! ```rust,no_run
//! use ai_batch_rust::batch::{BatchScheduler, ItemExecutor, ResultReporter};
//! use ai_batch_rust::resilience::{RateLimiter, RetryPolicy};
//! use ai_batch_rust::transport::HttpTransport;
//! use ai_batch_rust::config::ModelConfig;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> ai_batch_rust::Result<()> {
//! let transport = Arc::new(HttpTransport::new(&ModelConfig::default())?);
//! let executor = ItemExecutor::new(
//!     transport,
//!     Arc::new(RateLimiter::new(60)?),
//!     RetryPolicy::default(),
//!     3,
//!     CancellationToken::new(),
//! );
//! let scheduler = BatchScheduler::new(Arc::new(executor), 10, 5)?;
//!
//! let reviews = vec!["great product".to_string(), "arrived broken".to_string()];
//! let outcomes = scheduler
//!     .run("2024-W05", reviews, |r| format!("Classify the sentiment of: {}", r))
//!     .await?;
//! ResultReporter::new().log_results(&outcomes);
//! # Ok(())
//! # }
//! ```

mod executor;
mod outcome;
mod report;
mod scheduler;

pub use executor::ItemExecutor;
pub use outcome::{FailureKind, ItemFailure, Outcome};
pub use report::{ResultReporter, ResultSummary};
pub use scheduler::BatchScheduler;
