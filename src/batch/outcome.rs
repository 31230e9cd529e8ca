//! Terminal per-item records.

use crate::transport::TransportError;
use crate::types::{Completion, Usage};
use std::time::Duration;

/// Why an item ended without output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemFailure {
    /// The rendered prompt was empty; no request was made.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Cancellation was signaled before the item finished.
    #[error("cancelled")]
    Cancelled,

    /// Every allowed attempt failed; carries the last underlying error.
    #[error("failed after {attempts} attempts: {last}")]
    RetryExhausted { attempts: u32, last: TransportError },
}

/// Failure taxonomy used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Validation,
    Transport,
    Protocol,
    Decode,
    Cancelled,
    RetryExhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Transport => "transport",
            FailureKind::Protocol => "protocol",
            FailureKind::Decode => "decode",
            FailureKind::Cancelled => "cancelled",
            FailureKind::RetryExhausted => "retry_exhausted",
        }
    }
}

impl From<&TransportError> for FailureKind {
    fn from(e: &TransportError) -> Self {
        match e {
            TransportError::Connection(_) | TransportError::Timeout(_) => FailureKind::Transport,
            TransportError::Protocol { .. } => FailureKind::Protocol,
            TransportError::Decode(_) => FailureKind::Decode,
        }
    }
}

impl ItemFailure {
    pub fn empty_prompt() -> Self {
        ItemFailure::Validation {
            message: "empty prompt generated".to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ItemFailure::Validation { .. } => FailureKind::Validation,
            ItemFailure::Cancelled => FailureKind::Cancelled,
            ItemFailure::RetryExhausted { .. } => FailureKind::RetryExhausted,
        }
    }

    /// Classification of the last transport error, for exhausted items.
    pub fn last_error_kind(&self) -> Option<FailureKind> {
        match self {
            ItemFailure::RetryExhausted { last, .. } => Some(FailureKind::from(last)),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ItemFailure::Cancelled)
    }
}

/// Terminal record for one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Position of the item in the input sequence.
    pub index: usize,
    pub result: Result<Completion, ItemFailure>,
    /// Attempts made beyond the first.
    pub retries: u32,
    /// From the first attempt's start to resolution, backoff waits included.
    pub duration: Duration,
}

impl Outcome {
    pub fn success(index: usize, completion: Completion, retries: u32, duration: Duration) -> Self {
        Self {
            index,
            result: Ok(completion),
            retries,
            duration,
        }
    }

    pub fn failure(index: usize, failure: ItemFailure, retries: u32, duration: Duration) -> Self {
        Self {
            index,
            result: Err(failure),
            retries,
            duration,
        }
    }

    pub fn cancelled(index: usize) -> Self {
        Self::failure(index, ItemFailure::Cancelled, 0, Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn output(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|c| c.content.as_str())
    }

    pub fn error(&self) -> Option<&ItemFailure> {
        self.result.as_ref().err()
    }

    /// Usage of the successful call; zero for failures.
    pub fn usage(&self) -> Usage {
        self.result
            .as_ref()
            .map(|c| c.usage)
            .unwrap_or_default()
    }
}
