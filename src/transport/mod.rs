//! 传输层模块：单次模型调用的边界与失败分类。
//!
//! # Transport Module
//!
//! The transport performs exactly one network call per attempt: it serializes
//! the request, applies the per-call timeout, decodes the response and
//! classifies any failure. Retrying is *not* its job; see
//! [`ItemExecutor`](crate::batch::ItemExecutor).
//!
//! | Failure class | Variant | Retryable |
//! |---------------|---------|-----------|
//! | transport-level | [`TransportError::Connection`], [`TransportError::Timeout`] | yes |
//! | protocol-level | [`TransportError::Protocol`] | yes |
//! | decode-level | [`TransportError::Decode`] | yes |
//!
//! No class is fatal on its own; an item only fails for good once its retry
//! budget is spent.

mod http;

pub use http::{decode_response, HttpTransport};

use crate::types::Completion;
use async_trait::async_trait;
use std::time::Duration;

/// One network call: `(prompt, system message) -> completion`.
///
/// Implementations must be cheap to share across worker tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, prompt: &str, system_message: &str)
        -> Result<Completion, TransportError>;
}

/// Classified failure of a single transport call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error{}: {message}", format_status(.status))]
    Protocol {
        status: Option<u16>,
        message: String,
        error_type: Option<String>,
        code: Option<String>,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(" (HTTP {})", s),
        None => String::new(),
    }
}

impl TransportError {
    /// All classes are retried; only the retry budget ends an item.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Classification name used in logs and reports.
    pub fn class(&self) -> &'static str {
        match self {
            TransportError::Connection(_) | TransportError::Timeout(_) => "transport",
            TransportError::Protocol { .. } => "protocol",
            TransportError::Decode(_) => "decode",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Protocol { status, .. } => *status,
            _ => None,
        }
    }
}
