//! # ai-batch-rust
//!
//! 面向大模型 API 的批量调用运行时：令牌桶限流、有界并发、指数退避重试与用量统计。
//!
//! Batch runtime for chat-completion APIs: push thousands of independent
//! prompts through a remote model without tripping rate limits, while keeping
//! every item's result, retry count and token cost.
//!
//! ## Overview
//!
//! Each work item is rendered into a prompt, gated by a token-bucket rate
//! limiter, sent through a [`transport::Transport`], and retried with backoff
//! on failure. Items run in fixed-size batches over a bounded worker pool;
//! the caller gets back one [`batch::Outcome`] per item, in input order.
//!
//! ## Key Features
//!
//! - **Rate limiting**: requests-per-minute token bucket via [`resilience::RateLimiter`]
//! - **Retries**: fixed or exponential capped backoff via [`resilience::RetryPolicy`]
//! - **Bounded concurrency**: batches with a barrier, at most `max_concurrent` items in flight
//! - **Usage and cost**: per-label token ledger with model pricing via [`tokens`]
//! - **Cancellation**: one [`tokio_util::sync::CancellationToken`] stops all outstanding work
//! - **Reporting**: summary statistics and a per-item table via [`batch::ResultReporter`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_batch_rust::{BatchProcessor, ProcessorConfig};
//!
//! #[tokio::main]
//! async fn main() -> ai_batch_rust::Result<()> {
//!     let config = ProcessorConfig::load("config/processor.yaml")?;
//!     ai_batch_rust::logging::init(&config.logging)?;
//!
//!     let processor = BatchProcessor::new(config)?;
//!     ai_batch_rust::shutdown::cancel_on_interrupt(processor.cancellation_token());
//!
//!     let reviews = vec!["fast delivery".to_string(), "box was damaged".to_string()];
//!     let outcomes = processor
//!         .process_batch("2024-W05", reviews, |r| {
//!             format!("Return {{\"sentiment\": ...}} for this review: {}", r)
//!         })
//!         .await?;
//!
//!     processor.log_report(&outcomes);
//!     if let Some(report) = processor.usage_report() {
//!         println!("{}", report);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`processor`] | `BatchProcessor` facade and its builder |
//! | [`batch`] | Item executor, batch scheduler, outcomes and reporting |
//! | [`resilience`] | Rate limiter and retry policy |
//! | [`transport`] | Transport trait, failure classification, HTTP implementation |
//! | [`tokens`] | Model pricing and usage tracking |
//! | [`types`] | Chat-completion wire types |
//! | [`config`] | YAML configuration, environment overrides, validation |
//! | [`logging`] | Tracing subscriber setup |
//! | [`shutdown`] | Signal-to-cancellation bridge |

pub mod batch;
pub mod config;
pub mod logging;
pub mod processor;
pub mod resilience;
pub mod shutdown;
pub mod tokens;
pub mod transport;
pub mod types;
pub mod utils;

pub use batch::{ItemFailure, Outcome};
pub use config::ProcessorConfig;
pub use processor::{BatchProcessor, BatchProcessorBuilder};
pub use tokens::UsageTracker;
pub use transport::{Transport, TransportError};
pub use types::{Completion, Message, MessageRole, Usage};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
