use thiserror::Error;

/// Error types that can occur while querying backends or scoring answers.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Missing or invalid credentials, endpoints or identifiers
    #[error("Configuration error for {target}: {}", problems.join(", "))]
    ConfigurationError {
        target: String,
        problems: Vec<String>,
    },
    /// Network failure or timeout while talking to a backend
    #[error("Transport error: {0}")]
    TransportError(String),
    /// Backend answered with a non-2xx status
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    /// Structurally invalid payload returned by a backend
    #[error("Malformed response: {message}. Raw response: {raw_response}")]
    MalformedResponse {
        message: String,
        raw_response: String,
    },
    /// Scoring dependency failed or returned something unusable
    #[error("Judge error: {0}")]
    JudgeError(String),
    /// Evaluator type not present in the registry
    #[error("Unknown evaluator type: {0}")]
    UnknownEvaluator(String),
    /// A result cube cell was written twice
    #[error("Result cell ({system}, {evaluator}) already written")]
    DuplicateCell { system: String, evaluator: String },
    /// Invalid request parameters or template
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// Retry attempts exceeded
    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetryExceeded { attempts: usize, last_error: String },
    /// Test case file could not be read or parsed
    #[error("Test case error: {0}")]
    TestCases(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Whether the condition is a transport-level failure worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            BenchError::TransportError(_) => true,
            BenchError::HttpStatus { .. } => true,
            BenchError::ConfigurationError { .. } => false,
            BenchError::MalformedResponse { .. } => false,
            BenchError::JudgeError(_) => false,
            BenchError::UnknownEvaluator(_) => false,
            BenchError::DuplicateCell { .. } => false,
            BenchError::InvalidRequest(_) => false,
            BenchError::JsonError(_) => false,
            BenchError::RetryExceeded { .. } => false,
            BenchError::TestCases(_) => false,
            BenchError::Io(_) => false,
        }
    }

    pub(crate) fn configuration(target: impl Into<String>, problems: Vec<String>) -> Self {
        BenchError::ConfigurationError {
            target: target.into(),
            problems,
        }
    }
}

/// Converts reqwest transport errors into BenchErrors
impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return BenchError::HttpStatus {
                status: status.as_u16(),
                body: err.to_string(),
            };
        }
        BenchError::TransportError(err.to_string())
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_conditions_are_transient() {
        assert!(BenchError::TransportError("timed out".into()).is_transient());
        assert!(BenchError::HttpStatus {
            status: 500,
            body: String::new()
        }
        .is_transient());
        assert!(!BenchError::MalformedResponse {
            message: "missing answer".into(),
            raw_response: "{}".into()
        }
        .is_transient());
        assert!(!BenchError::JsonError("eof".into()).is_transient());
    }

    #[test]
    fn configuration_error_lists_problems() {
        let err = BenchError::configuration("dify", vec!["api_key".into(), "base_url".into()]);
        assert_eq!(
            err.to_string(),
            "Configuration error for dify: api_key, base_url"
        );
    }
}
