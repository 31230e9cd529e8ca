//! 弹性模式模块：提供限流器与重试退避策略。
//!
//! # Resilience Primitives Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Token bucket bounding how fast calls are *started* |
//! | [`retry`] | Backoff delay schedule between attempts of one item |
//!
//! ## Rate Limiter
//!
//! ```rust
//! use ai_batch_rust::resilience::RateLimiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ai_batch_rust::Result<()> {
//! let limiter = RateLimiter::new(60)?; // 60 requests/minute, one token per second
//! limiter.acquire().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry Policy
//!
//! ```rust
//! use ai_batch_rust::resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(5), true);
//! assert_eq!(policy.delay(0), Duration::from_secs(1));
//! assert_eq!(policy.delay(3), Duration::from_secs(5));
//! ```

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{RateLimiter, RateLimiterSnapshot};
pub use retry::RetryPolicy;
