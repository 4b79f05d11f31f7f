use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BenchError;

use super::config::JudgeConfig;
use super::score::clamp_score;

/// Scoring dependency that answers a prompt with free text.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn judge(&self, prompt: &str) -> Result<String, BenchError>;
}

/// LLM judge reached through an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug)]
pub struct OpenAICompatibleJudge {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct JudgeChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct JudgeChatRequest<'a> {
    model: &'a str,
    messages: Vec<JudgeChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct JudgeChatResponse {
    choices: Vec<JudgeChatChoice>,
}

#[derive(Deserialize, Debug)]
struct JudgeChatChoice {
    message: JudgeChatMsg,
}

#[derive(Deserialize, Debug)]
struct JudgeChatMsg {
    content: Option<String>,
}

impl OpenAICompatibleJudge {
    pub fn new(config: &JudgeConfig) -> Result<Self, BenchError> {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &JudgeConfig) -> Result<Self, BenchError> {
        let mut problems = Vec::new();
        let api_key = config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().trim().to_string())
            .filter(|key| !key.is_empty());
        if api_key.is_none() {
            problems.push("judge.api_key".to_string());
        }
        if Url::parse(&config.base_url).is_err() {
            problems.push(format!("judge.base_url (invalid URL: {})", config.base_url));
        }
        if config.model.trim().is_empty() {
            problems.push("judge.model".to_string());
        }

        match api_key {
            Some(api_key) if problems.is_empty() => Ok(Self {
                client,
                api_key: SecretString::new(api_key),
                base_url: config.base_url.trim_end_matches('/').to_string(),
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                timeout: Duration::from_secs(config.timeout_seconds),
            }),
            _ => Err(BenchError::configuration("judge", problems)),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl JudgeClient for OpenAICompatibleJudge {
    async fn judge(&self, prompt: &str) -> Result<String, BenchError> {
        let body = JudgeChatRequest {
            model: &self.model,
            messages: vec![JudgeChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| BenchError::JudgeError(err.to_string()))?;

        log::debug!("Judge HTTP status: {}", resp.status());
        if !resp.status().is_success() {
            return Err(BenchError::JudgeError(format!(
                "judge returned HTTP {}",
                resp.status()
            )));
        }

        let parsed: JudgeChatResponse = resp
            .json()
            .await
            .map_err(|err| BenchError::JudgeError(format!("unreadable judge reply: {err}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BenchError::JudgeError("judge reply has no content".to_string()))
    }
}

fn object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("object pattern is valid"))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("number pattern is valid"))
}

/// Finds the first flat JSON object embedded in a judge reply.
pub fn parse_score_object(text: &str) -> Option<Map<String, Value>> {
    object_pattern()
        .find_iter(text)
        .find_map(|m| serde_json::from_str::<Map<String, Value>>(m.as_str()).ok())
}

/// Reads one metric from a parsed score object, accepting numbers or numeric strings.
pub(crate) fn metric_score(object: &Map<String, Value>, metric: &str) -> Option<f64> {
    match object.get(metric)? {
        Value::Number(n) => n.as_f64().and_then(clamp_score),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(clamp_score),
        _ => None,
    }
}

/// Reads a reply that was asked to contain only a score.
///
/// The trimmed reply must be a single number, optionally inside a code fence or
/// quotes. Anything else (prose, fractions like `8/10`) is `None`.
pub fn parse_bare_score(text: &str) -> Option<f64> {
    let mut text = text.trim();
    if let Some(fenced) = text.strip_prefix("```") {
        let fenced = fenced.strip_suffix("```")?;
        // Optional language tag on the opening fence line.
        text = match fenced.split_once('\n') {
            Some((tag, body)) if !number_pattern().is_match(tag.trim()) => body,
            _ => fenced,
        }
        .trim();
    }
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            text = inner.trim();
            break;
        }
    }

    number_pattern()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(clamp_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn parses_object_surrounded_by_prose() {
        let reply = "Here is my verdict:\n```json\n{\"relevancy\": 0.8, \"correctness\": \"0.6\"}\n```";
        let object = parse_score_object(reply).unwrap();
        assert_eq!(metric_score(&object, "relevancy"), Some(0.8));
        assert_eq!(metric_score(&object, "correctness"), Some(0.6));
        assert_eq!(metric_score(&object, "clarity"), None);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let object = parse_score_object(r#"{"relevancy": 7, "clarity": -1}"#).unwrap();
        assert_eq!(metric_score(&object, "relevancy"), Some(1.0));
        assert_eq!(metric_score(&object, "clarity"), Some(0.0));
    }

    #[test]
    fn unparseable_reply_yields_none() {
        assert!(parse_score_object("I cannot grade this").is_none());
        assert!(parse_score_object("{not json}").is_none());
        assert_eq!(parse_bare_score("n/a"), None);
    }

    #[rstest]
    #[case(" 0.75\n", Some(0.75))]
    #[case("1", Some(1.0))]
    #[case("1.5", Some(1.0))]
    #[case("\"0.4\"", Some(0.4))]
    #[case("```\n0.6\n```", Some(0.6))]
    #[case("```text\n0.2\n```", Some(0.2))]
    #[case("Score: 0.5", None)]
    #[case("8/10", None)]
    #[case("I rate it 4 out of 5", None)]
    #[case("On a scale from 0.0 to 1.0 I would give 0.3", None)]
    fn bare_score_accepts_only_a_lone_number(#[case] reply: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_bare_score(reply), expected);
    }

    #[test]
    fn construction_requires_api_key() {
        let err = OpenAICompatibleJudge::new(&JudgeConfig::default()).unwrap_err();
        assert!(err.to_string().contains("judge.api_key"));
    }

    #[tokio::test]
    async fn judge_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer judge-key")
            .with_status(200)
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": "0.9"}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let config = JudgeConfig {
            api_key: Some(SecretString::new("judge-key".to_string())),
            base_url: server.url(),
            ..JudgeConfig::default()
        };
        let judge = OpenAICompatibleJudge::new(&config).unwrap();

        assert_eq!(judge.judge("score this").await.unwrap(), "0.9");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn judge_http_failure_is_a_judge_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let config = JudgeConfig {
            api_key: Some(SecretString::new("judge-key".to_string())),
            base_url: server.url(),
            ..JudgeConfig::default()
        };
        let judge = OpenAICompatibleJudge::new(&config).unwrap();

        assert!(matches!(
            judge.judge("score this").await,
            Err(BenchError::JudgeError(_))
        ));
    }
}
