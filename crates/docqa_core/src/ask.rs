use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};

use crate::{AskRequest, AskResponse, History, QaItem};

pub const DEFAULT_TOP_K: u32 = 5;
/// Chunk counts the user may ask for; callers clamp input to this.
pub const TOP_K_RANGE: RangeInclusive<u32> = 1..=20;

/// Builds the wire request, or `None` when the trimmed question is empty.
pub fn prepare_request(
    question: &str,
    top_k: u32,
    selected_documents: &[String],
) -> Option<AskRequest> {
    let question = question.trim();
    if question.is_empty() {
        return None;
    }
    Some(AskRequest {
        question: question.to_string(),
        top_k,
        selected_documents: selected_documents.to_vec(),
    })
}

/// Displayable stand-in for a failed ask.
pub fn error_answer(message: &str) -> AskResponse {
    AskResponse {
        answer: format!("Error: {message}"),
        ..AskResponse::default()
    }
}

/// The current-answer slot, the busy flag and the history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AskState {
    answer: Option<AskResponse>,
    asking: bool,
    history: History,
}

impl AskState {
    pub fn new(history: History) -> Self {
        Self {
            answer: None,
            asking: false,
            history,
        }
    }

    pub fn answer(&self) -> Option<&AskResponse> {
        self.answer.as_ref()
    }

    pub fn is_asking(&self) -> bool {
        self.asking
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Marks the controller busy and drops any stale answer.
    pub fn begin(&mut self) {
        self.asking = true;
        self.answer = None;
    }

    /// Applies the outcome of one request. Returns true when the history changed.
    pub fn complete(
        &mut self,
        request: &AskRequest,
        result: Result<AskResponse, String>,
        at: DateTime<Utc>,
    ) -> bool {
        self.asking = false;
        match result {
            Ok(response) => {
                self.history.record(QaItem {
                    question: request.question.clone(),
                    answer: response.answer.clone(),
                    time: at,
                    source_documents: response.source_documents.clone(),
                });
                self.answer = Some(response);
                true
            }
            Err(message) => {
                self.answer = Some(error_answer(&message));
                false
            }
        }
    }
}
