use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DocId = u64;
pub type BatchId = u64;

/// Upload lifecycle of a locally tracked file.
///
/// `Queued → Parsing → Chunked → Embedded`, or any non-terminal state `→ Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocStatus {
    Queued,
    Parsing,
    Chunked,
    Embedded,
    Error,
}

impl DocStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DocStatus::Embedded | DocStatus::Error)
    }
}

/// File metadata captured when the user selects a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
}

impl FileMeta {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocItem {
    pub id: DocId,
    pub name: String,
    pub size: u64,
    pub status: DocStatus,
    /// Set only while `status == DocStatus::Error`.
    pub error: Option<String>,
}

/// A document as the remote registry knows it, keyed by `filename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub filename: String,
    pub upload_time: String,
    pub chunks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub top_k: u32,
    pub selected_documents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<String>>,
}

/// One past question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaItem {
    pub question: String,
    pub answer: String,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<String>>,
}

/// One line of ingestion activity, stamped when its outcome was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Health {
    #[default]
    Unknown,
    Up,
    Down,
}

impl Health {
    /// Maps the `status` field of a successful liveness body.
    pub fn from_reported(status: &str) -> Self {
        if status == "up" {
            Health::Up
        } else {
            Health::Down
        }
    }
}
