use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-query placeholder values that take precedence over backend fields.
pub type Extras = BTreeMap<String, String>;

/// HTTP verbs a template may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// Declarative request/response mapping for one backend family.
///
/// Templates hold no per-backend state and are shared between every
/// [`BackendConfig`](crate::connector::BackendConfig) bound to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Backend fields that must be present for a config to be usable.
    #[serde(default)]
    pub required: Vec<String>,
    /// Fallback placeholder values.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    pub request: RequestSpec,
    pub response: ResponseSpec,
}

/// Request builders. Strings may contain `{placeholder}` tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

/// Response extractor expressed as JSON pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Pointer to the mandatory answer string.
    pub answer: String,
    #[serde(default)]
    pub contexts: Option<ContextSpec>,
    /// Metadata name to pointer; pointers that do not resolve are skipped.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Where retrieved contexts live: an array of strings, or of objects carrying `field`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSpec {
    pub path: String,
    #[serde(default)]
    pub field: Option<String>,
}

/// Fully resolved request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Normalized backend response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub answer: String,
    pub contexts: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
}
