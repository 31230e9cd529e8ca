//! Token 用量与成本统计模块：按标签累计 Token 用量并估算费用。
//!
//! # Token Usage and Cost Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ModelPricing`] | Input/output USD price per 1M tokens for a model |
//! | [`UsageTracker`] | Concurrent ledger of usage per label plus a running grand total |
//! | [`UsageRecord`] | One successful call's tokens and estimated cost |
//! | [`UsageTotals`] | Folded totals for a label or for everything |
//!
//! ## Example
//!
//! ```rust
//! use ai_batch_rust::tokens::UsageTracker;
//!
//! let tracker = UsageTracker::new("gpt-4o-mini");
//! tracker.record("2024-W05", 1200, 300);
//! tracker.record("2024-W06", 800, 150);
//!
//! assert_eq!(tracker.summary("2024-W05").total_tokens, 1500);
//! assert_eq!(tracker.total_summary().requests, 2);
//! ```
//!
//! Unrecognized model ids are priced at the default (gpt-4o) tier rather than rejected.

mod pricing;
mod tracker;

pub use pricing::ModelPricing;
pub use tracker::{UsageRecord, UsageTotals, UsageTracker};
