use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::{
    error::BenchError,
    health::HealthProvider,
    template::{Extras, ParsedResponse, Template, TemplateProcessor},
};

use super::config::{BackendConfig, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use super::result::QueryResult;

/// Question sent by the startup canary.
pub const CANARY_QUESTION: &str = "Hello";

const ERROR_BODY_PREVIEW: usize = 300;

/// Binds one backend configuration to a template and performs the network I/O.
///
/// [`Connector::query`] never fails: every fault is folded into the returned
/// [`QueryResult`].
#[derive(Debug, Clone)]
pub struct Connector {
    config: Arc<BackendConfig>,
    processor: TemplateProcessor,
    client: Client,
    timeout: Duration,
}

/// Descriptive snapshot of a connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub name: String,
    pub template: String,
    pub description: String,
    pub config_valid: bool,
}

impl Connector {
    /// Creates a connector, rejecting configs the template considers incomplete.
    pub fn new(config: BackendConfig, template: Arc<Template>) -> Result<Self, BenchError> {
        Self::with_client(Client::new(), config, template)
    }

    /// Creates a connector sharing an existing HTTP client.
    pub fn with_client(
        client: Client,
        config: BackendConfig,
        template: Arc<Template>,
    ) -> Result<Self, BenchError> {
        let processor = TemplateProcessor::new(template);
        let problems = processor.validate_config(&config);
        if !problems.is_empty() {
            return Err(BenchError::configuration(&config.name, problems));
        }
        log::info!(
            "Connector initialized for {} ({} template)",
            config.name,
            processor.template().name
        );
        Ok(Self {
            config: Arc::new(config),
            processor,
            client,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queries with the default retry bound and no extras.
    pub async fn ask(&self, question: &str) -> QueryResult {
        self.query(question, DEFAULT_MAX_RETRIES, &Extras::new())
            .await
    }

    /// Sends `question`, making up to `max_retries + 1` attempts.
    ///
    /// Only transport failures (network, timeout, non-2xx) are retried; malformed
    /// payloads and template errors end the query immediately.
    pub async fn query(&self, question: &str, max_retries: usize, extras: &Extras) -> QueryResult {
        let attempts = max_retries.saturating_add(1);
        let mut last_err: Option<BenchError> = None;

        for attempt in 1..=attempts {
            match self.attempt(question, extras).await {
                Ok(parsed) => {
                    log::debug!("{} query successful on attempt {attempt}", self.name());
                    return parsed.into();
                }
                Err(err) if err.is_transient() => {
                    if attempt < attempts {
                        log::warn!("{} attempt {attempt} failed, retrying: {err}", self.name());
                    }
                    last_err = Some(err);
                }
                Err(err) => {
                    log::error!("{} unexpected error: {err}", self.name());
                    return QueryResult::failed(format!("Unexpected error: {err}"));
                }
            }
        }

        let err = BenchError::RetryExceeded {
            attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        };
        log::error!("{} {err}", self.name());
        QueryResult::failed(err.to_string())
    }

    async fn attempt(&self, question: &str, extras: &Extras) -> Result<ParsedResponse, BenchError> {
        let request = self
            .processor
            .build_request(&self.config, question, extras)?;

        if log::log_enabled!(log::Level::Trace) {
            if let Ok(json) = serde_json::to_string(&request.body) {
                log::trace!("{} request payload: {}", self.name(), json);
            }
        }

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .timeout(self.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_null() {
            builder = builder.json(&request.body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        log::debug!("{} HTTP status: {}", self.name(), status);

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BenchError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
            });
        }
        self.processor.parse_response(&body)
    }

    /// Issues the canary question; healthy iff it comes back without error and non-empty.
    pub async fn test_connection(&self) -> bool {
        match self.health_check().await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("{} connection test failed: {err}", self.name());
                false
            }
        }
    }

    pub fn system_info(&self) -> SystemInfo {
        let template = self.processor.template();
        SystemInfo {
            name: self.config.name.clone(),
            template: template.name.clone(),
            description: template.description.clone(),
            config_valid: self.processor.validate_config(&self.config).is_empty(),
        }
    }
}

#[async_trait]
impl HealthProvider for Connector {
    async fn health_check(&self) -> Result<(), BenchError> {
        let result = self.ask(CANARY_QUESTION).await;
        if let Some(err) = result.error {
            return Err(BenchError::TransportError(err));
        }
        if result.answer.trim().is_empty() {
            return Err(BenchError::MalformedResponse {
                message: "canary query returned an empty answer".to_string(),
                raw_response: String::new(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateLibrary;
    use mockito::Matcher;
    use serde_json::json;

    fn connector(base_url: &str) -> Connector {
        let config = BackendConfig::new("dify", "dify")
            .with_api_key("test-key")
            .with_base_url(base_url);
        Connector::new(config, TemplateLibrary::builtin().get("dify").unwrap())
            .unwrap()
            .with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn missing_credential_fails_construction() {
        let config = BackendConfig::new("dify", "dify").with_base_url("http://localhost");
        let err = Connector::new(config, TemplateLibrary::builtin().get("dify").unwrap())
            .unwrap_err();
        match err {
            BenchError::ConfigurationError { target, problems } => {
                assert_eq!(target, "dify");
                assert_eq!(problems, vec!["api_key".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn successful_query_returns_answer_and_contexts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat-messages")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({"query": "What is RAG?"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "answer": "Retrieval augmented generation",
                    "metadata": {"retriever_resources": [{"content": "ctx"}]}
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let result = connector(&server.url()).ask("What is RAG?").await;

        mock.assert_async().await;
        assert_eq!(result.answer, "Retrieval augmented generation");
        assert_eq!(result.contexts, vec!["ctx"]);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn server_errors_exhaust_exactly_max_retries_plus_one_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat-messages")
            .with_status(500)
            .with_body("boom")
            .expect(4)
            .create_async()
            .await;

        let result = connector(&server.url())
            .query("q", 3, &Extras::new())
            .await;

        mock.assert_async().await;
        assert_eq!(result.answer, "");
        assert!(result.contexts.is_empty());
        let error = result.error.unwrap();
        assert!(error.contains("after 4 attempts"), "{error}");
        assert!(error.contains("500"), "{error}");
    }

    #[tokio::test]
    async fn unbounded_retry_setting_does_not_overflow() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat-messages")
            .with_status(200)
            .with_body(json!({"answer": "ok"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let result = connector(&server.url())
            .query("q", usize::MAX, &Extras::new())
            .await;

        mock.assert_async().await;
        assert_eq!(result.answer, "ok");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn health_check_requires_a_non_empty_canary_answer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/up/chat-messages")
            .match_body(Matcher::PartialJson(json!({"query": CANARY_QUESTION})))
            .with_status(200)
            .with_body(json!({"answer": "Hello!"}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/mute/chat-messages")
            .with_status(200)
            .with_body(json!({"answer": "  "}).to_string())
            .create_async()
            .await;

        let up = connector(&format!("{}/up", server.url()));
        let mute = connector(&format!("{}/mute", server.url()));

        assert!(up.health_check().await.is_ok());
        assert!(matches!(
            mute.health_check().await,
            Err(BenchError::MalformedResponse { .. })
        ));
        assert!(up.test_connection().await);
        assert!(!mute.test_connection().await);
    }

    #[tokio::test]
    async fn malformed_payload_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat-messages")
            .with_status(200)
            .with_body(r#"{"event": "message"}"#)
            .expect(1)
            .create_async()
            .await;

        let result = connector(&server.url()).ask("q").await;

        mock.assert_async().await;
        assert_eq!(result.answer, "");
        assert!(result.error.unwrap().starts_with("Unexpected error"));
    }

    #[tokio::test]
    async fn recovers_when_a_retry_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/chat-messages")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/chat-messages")
            .with_status(200)
            .with_body(r#"{"answer": "second time lucky"}"#)
            .expect(1)
            .create_async()
            .await;

        let result = connector(&server.url()).ask("q").await;

        failing.assert_async().await;
        ok.assert_async().await;
        assert_eq!(result.answer, "second time lucky");
    }

    #[tokio::test]
    async fn unreachable_backend_reports_attempt_count() {
        let result = connector("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(500))
            .query("q", 0, &Extras::new())
            .await;
        assert!(result.error.unwrap().contains("after 1 attempts"));
    }

    #[tokio::test]
    async fn canary_requires_non_empty_answer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat-messages")
            .with_status(200)
            .with_body(r#"{"answer": ""}"#)
            .create_async()
            .await;

        assert!(!connector(&server.url()).test_connection().await);
    }

    #[test]
    fn system_info_describes_template() {
        let info = connector("http://localhost").system_info();
        assert_eq!(info.name, "dify");
        assert_eq!(info.template, "dify");
        assert!(info.config_valid);
    }
}
