use std::fmt;

use docqa_core::BatchId;
use thiserror::Error;

/// A classified failure of one remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    /// Display text: the service's `detail` when it sent one.
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// True when the request never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, FailureKind::Transport | FailureKind::Timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Transport,
    Timeout,
    /// Non-2xx response.
    Status(u16),
    /// 2xx response whose body did not have the expected shape.
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Status(code) => write!(f, "http status {code}"),
            FailureKind::Decode => write!(f, "malformed response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was selected; no request was made.
    Skipped,
    Ingested { batch: BatchId, files: usize },
    Failed { batch: BatchId, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Unknown item, or a delete for it is already outstanding.
    Skipped,
    Deleted { filename: String },
    Failed { filename: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// Blank question; no request was made.
    Skipped,
    Answered,
    Failed { message: String },
}
