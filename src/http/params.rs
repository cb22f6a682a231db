use serde::{Deserialize, Serialize};

use crate::generate::{GenerationRequest, QuestionKind};

/// Body of `POST /log`, as sent by the browser extension.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LogParams {
    /// Question text shown on the page
    pub question: Option<String>,
    /// Answer options (gap text with `[a | b]` brackets, or matching terms)
    pub answer: Option<String>,
    /// Question type: "gaptext", "matching", or anything else for free form
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl LogParams {
    pub fn into_request(self) -> GenerationRequest {
        GenerationRequest {
            question: self.question.unwrap_or_default(),
            answer: self.answer.unwrap_or_default(),
            kind: self
                .kind
                .as_deref()
                .map(QuestionKind::from_label)
                .unwrap_or_default(),
        }
    }
}

/// JSON status body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusBody {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl StatusBody {
    pub fn new(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: Some(message.into()),
            response: None,
        }
    }
}
