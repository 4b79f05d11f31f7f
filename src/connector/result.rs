use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::template::ParsedResponse;

/// Outcome of one question sent to one backend. Failures are carried in-band:
/// an empty answer plus an error message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub contexts: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True when the backend produced a non-blank answer without error.
    pub fn has_answer(&self) -> bool {
        !self.is_error() && !self.answer.trim().is_empty()
    }
}

impl From<ParsedResponse> for QueryResult {
    fn from(parsed: ParsedResponse) -> Self {
        Self {
            answer: parsed.answer,
            contexts: parsed.contexts,
            metadata: parsed.metadata,
            error: None,
        }
    }
}
