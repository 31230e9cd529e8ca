//! Batch processor facade.
//!
//! Wires configuration, transport, rate limiter, retry policy, usage tracker
//! and scheduler into one handle. Implementation details are split into
//! submodules under `src/processor/`.

pub mod builder;
pub mod core;
pub mod signals;

pub use builder::BatchProcessorBuilder;
pub use core::BatchProcessor;
pub use signals::{InflightSnapshot, SignalsSnapshot};
