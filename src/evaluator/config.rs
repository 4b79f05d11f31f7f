use secrecy::SecretString;
use serde::{Deserialize, Serialize};

const DEFAULT_JUDGE_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_JUDGE_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_JUDGE_MAX_TOKENS: u32 = 1_000;
const DEFAULT_EMBEDDING_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text:latest";
const DEFAULT_DEPENDENCY_TIMEOUT_SECS: u64 = 30;

/// Settings shared by every evaluator constructor.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub judge: JudgeConfig,
    pub embedding: EmbeddingConfig,
    pub parse_failure: ParseFailurePolicy,
}

/// OpenAI-compatible chat endpoint used as an LLM judge.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_JUDGE_BASE_URL.to_string(),
            model: DEFAULT_JUDGE_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_JUDGE_MAX_TOKENS,
            timeout_seconds: DEFAULT_DEPENDENCY_TIMEOUT_SECS,
        }
    }
}

/// Ollama-style embedding endpoint.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_seconds: DEFAULT_DEPENDENCY_TIMEOUT_SECS,
        }
    }
}

/// What an item scores when the judge reply cannot be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailurePolicy {
    /// Could not score; kept apart from an explicit verdict of 0.
    #[default]
    Absent,
    /// Worst score (0.0) for every metric of the item.
    Worst,
}

impl ParseFailurePolicy {
    pub fn fallback(self) -> Option<f64> {
        match self {
            ParseFailurePolicy::Absent => None,
            ParseFailurePolicy::Worst => Some(0.0),
        }
    }
}
