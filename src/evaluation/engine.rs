use std::time::Instant;

use futures::future::join_all;
use reqwest::Client;

use crate::connector::{BackendConfig, Connector, QueryResult};
use crate::error::BenchError;
use crate::evaluator::EvaluatorManager;
use crate::question::QuestionSet;
use crate::report::ResultTable;
use crate::template::TemplateLibrary;

use super::cube::ResultCube;
use super::settings::RunSettings;
use super::types::{ExcludedSystem, RunOutcome, SystemAnswers};

/// Drives a benchmark run: every active system answers every question, then every
/// realized evaluator scores every system.
pub struct EvaluationManager {
    connectors: Vec<Connector>,
    excluded: Vec<ExcludedSystem>,
    settings: RunSettings,
}

impl EvaluationManager {
    /// Uses the given connectors as the active set, without a canary check.
    pub fn new(connectors: Vec<Connector>, settings: RunSettings) -> Result<Self, BenchError> {
        if connectors.is_empty() {
            return Err(BenchError::configuration(
                "backends",
                vec!["no active backend".to_string()],
            ));
        }
        let mut seen: Vec<&str> = Vec::new();
        for connector in &connectors {
            if seen.contains(&connector.name()) {
                return Err(BenchError::configuration(
                    "backends",
                    vec![format!("duplicate backend name {}", connector.name())],
                ));
            }
            seen.push(connector.name());
        }

        Ok(Self {
            connectors,
            excluded: Vec::new(),
            settings,
        })
    }

    /// Builds connectors for every enabled backend and keeps those that pass the
    /// canary query.
    ///
    /// Gating happens once, before any question is sent. Fails only when no backend
    /// survives.
    pub async fn connect(
        backends: Vec<BackendConfig>,
        library: &TemplateLibrary,
        settings: RunSettings,
    ) -> Result<Self, BenchError> {
        let client = Client::new();
        let mut excluded = Vec::new();
        let mut candidates = Vec::new();

        for backend in backends {
            if !backend.enabled {
                log::info!("Skipping disabled backend {}", backend.name);
                continue;
            }
            let name = backend.name.clone();
            let Some(template) = library.get(backend.template_name()) else {
                let reason = format!("unknown template {}", backend.template_name());
                log::warn!("Excluding {name}: {reason}");
                excluded.push(ExcludedSystem { name, reason });
                continue;
            };
            match Connector::with_client(client.clone(), backend, template) {
                Ok(connector) => candidates.push(connector.with_timeout(settings.timeout())),
                Err(err) => {
                    log::warn!("Excluding {name}: {err}");
                    excluded.push(ExcludedSystem {
                        name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let probes = join_all(candidates.iter().map(|c| c.test_connection())).await;
        let mut connectors = Vec::new();
        for (connector, healthy) in candidates.into_iter().zip(probes) {
            if healthy {
                log::info!("{} passed the connection test", connector.name());
                connectors.push(connector);
            } else {
                excluded.push(ExcludedSystem {
                    name: connector.name().to_string(),
                    reason: "connection test failed".to_string(),
                });
            }
        }

        if connectors.is_empty() {
            let problems = excluded
                .iter()
                .map(|e| format!("{}: {}", e.name, e.reason))
                .collect::<Vec<_>>();
            return Err(BenchError::configuration(
                "backends",
                if problems.is_empty() {
                    vec!["no enabled backend".to_string()]
                } else {
                    problems
                },
            ));
        }

        let mut manager = Self::new(connectors, settings)?;
        manager.excluded = excluded;
        Ok(manager)
    }

    pub fn systems(&self) -> Vec<&str> {
        self.connectors.iter().map(Connector::name).collect()
    }

    pub fn excluded(&self) -> &[ExcludedSystem] {
        &self.excluded
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Sends every question to every active system.
    ///
    /// Systems run concurrently; within one system questions go out in order with the
    /// pacing delay between calls. Each sequence has exactly one result per question.
    pub async fn query_phase(&self, questions: &QuestionSet) -> Vec<SystemAnswers> {
        let runs = self
            .connectors
            .iter()
            .map(|connector| self.query_system(connector, questions));
        join_all(runs).await
    }

    async fn query_system(&self, connector: &Connector, questions: &QuestionSet) -> SystemAnswers {
        let start = Instant::now();
        let total = questions.len();
        let mut results: Vec<QueryResult> = Vec::with_capacity(total);

        for (idx, question) in questions.iter().enumerate() {
            if idx > 0 && self.settings.pacing_ms > 0 {
                tokio::time::sleep(self.settings.pacing()).await;
            }
            let result = connector
                .query(
                    &question.question,
                    self.settings.max_retries,
                    &self.settings.extras,
                )
                .await;
            match &result.error {
                Some(err) => log::warn!(
                    "{} question {}/{total} ({}) failed: {err}",
                    connector.name(),
                    idx + 1,
                    question.id
                ),
                None => log::info!("{} question {}/{total} answered", connector.name(), idx + 1),
            }
            results.push(result);
        }

        SystemAnswers {
            system: connector.name().to_string(),
            results,
            elapsed_ms: start.elapsed().as_millis(),
        }
    }

    /// Scores every system's answers and fills the cube.
    pub async fn score_phase(
        &self,
        questions: &QuestionSet,
        answers: &[SystemAnswers],
        evaluators: &EvaluatorManager,
    ) -> Result<ResultCube, BenchError> {
        let texts = questions.texts();
        let ground_truths = questions.ground_truths();
        let references = questions.reference_contexts();
        let mut cube = ResultCube::new();

        for system in answers {
            log::info!("Scoring {}", system.system);
            let contexts: Vec<Vec<String>> = system
                .results
                .iter()
                .zip(&references)
                .map(|(result, reference)| {
                    if result.contexts.is_empty() {
                        reference.clone()
                    } else {
                        result.contexts.clone()
                    }
                })
                .collect();

            let answer_texts = system.answers();
            let results = evaluators
                .evaluate_all(&texts, &answer_texts, &ground_truths, Some(contexts.as_slice()))
                .await;
            for (evaluator, record) in results {
                cube.insert(&system.system, &evaluator, record)?;
            }
        }
        Ok(cube)
    }

    /// Query phase, score phase, then table assembly.
    pub async fn run(
        &self,
        questions: &QuestionSet,
        evaluators: &EvaluatorManager,
    ) -> Result<RunOutcome, BenchError> {
        log::info!(
            "Running {} question(s) against {} system(s) with {} evaluator(s)",
            questions.len(),
            self.connectors.len(),
            evaluators.len()
        );
        let answers = self.query_phase(questions).await;
        let cube = self.score_phase(questions, &answers, evaluators).await?;
        let table = ResultTable::assemble(questions, &answers, &cube);
        Ok(RunOutcome {
            answers,
            cube,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Question;
    use crate::template::TemplateLibrary;
    use serde_json::json;
    use std::time::Duration;

    fn settings() -> RunSettings {
        RunSettings {
            max_retries: 1,
            pacing_ms: 0,
            ..RunSettings::default()
        }
    }

    fn dify(name: &str, url: &str) -> BackendConfig {
        BackendConfig::new(name, "dify")
            .with_api_key("key")
            .with_base_url(url)
    }

    #[tokio::test]
    async fn connect_excludes_unhealthy_and_misconfigured_backends() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/healthy/chat-messages")
            .with_status(200)
            .with_body(json!({"answer": "Hi there"}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/silent/chat-messages")
            .with_status(200)
            .with_body(json!({"answer": ""}).to_string())
            .create_async()
            .await;

        let backends = vec![
            dify("healthy", &format!("{}/healthy", server.url())),
            dify("silent", &format!("{}/silent", server.url())),
            BackendConfig::new("nokey", "dify").with_base_url(server.url()),
            dify("off", &server.url()).disabled(),
            BackendConfig::new("unknown", "no-such-template"),
        ];

        let manager = EvaluationManager::connect(backends, &TemplateLibrary::builtin(), settings())
            .await
            .unwrap();

        assert_eq!(manager.systems(), vec!["healthy"]);
        let excluded: Vec<_> = manager.excluded().iter().map(|e| e.name.as_str()).collect();
        assert!(excluded.contains(&"silent"));
        assert!(excluded.contains(&"nokey"));
        assert!(excluded.contains(&"unknown"));
        assert!(!excluded.contains(&"off"));
    }

    #[tokio::test]
    async fn connect_without_survivors_is_a_configuration_error() {
        let backends = vec![BackendConfig::new("nokey", "dify")];
        let err = EvaluationManager::connect(backends, &TemplateLibrary::builtin(), settings())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("nokey"));
    }

    #[tokio::test]
    async fn query_phase_keeps_positions_when_questions_fail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat-messages")
            .match_body(mockito::Matcher::PartialJson(json!({"query": "good"})))
            .with_status(200)
            .with_body(json!({"answer": "fine"}).to_string())
            .create_async()
            .await;
        server
            .mock("POST", "/chat-messages")
            .match_body(mockito::Matcher::PartialJson(json!({"query": "bad"})))
            .with_status(502)
            .create_async()
            .await;

        let template = TemplateLibrary::builtin().get("dify").unwrap();
        let connector = Connector::new(dify("sys", &server.url()), template).unwrap();
        let manager = EvaluationManager::new(vec![connector], settings()).unwrap();

        let questions = QuestionSet::new(vec![
            Question::new("", "good", "g"),
            Question::new("", "bad", "g"),
            Question::new("", "good", "g"),
        ]);
        let answers = manager.query_phase(&questions).await;

        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].results.len(), 3);
        assert_eq!(answers[0].answers(), vec!["fine", "", "fine"]);
        assert_eq!(answers[0].failures(), 1);
    }

    #[tokio::test]
    async fn pacing_separates_calls_to_the_same_backend() {
        let mut server = mockito::Server::new_async().await;
        for (question, answer) in [("first", "one"), ("second", "two"), ("third", "three")] {
            server
                .mock("POST", "/chat-messages")
                .match_body(mockito::Matcher::PartialJson(json!({"query": question})))
                .with_status(200)
                .with_body(json!({"answer": answer}).to_string())
                .expect(1)
                .create_async()
                .await;
        }

        let template = TemplateLibrary::builtin().get("dify").unwrap();
        let connector = Connector::new(dify("paced", &server.url()), template).unwrap();
        let paced = RunSettings {
            pacing_ms: 300,
            ..settings()
        };
        let manager = EvaluationManager::new(vec![connector], paced).unwrap();
        let questions = QuestionSet::new(vec![
            Question::new("", "first", "g"),
            Question::new("", "second", "g"),
            Question::new("", "third", "g"),
        ]);

        let start = Instant::now();
        let answers = manager.query_phase(&questions).await;
        let elapsed = start.elapsed();

        // Two gaps between three calls, none before the first.
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(900), "{elapsed:?}");
        assert_eq!(answers[0].answers(), vec!["one", "two", "three"]);
        assert!(answers[0].elapsed_ms >= 600);
    }

    #[test]
    fn duplicate_system_names_are_rejected() {
        let template = TemplateLibrary::builtin().get("dify").unwrap();
        let a = Connector::new(dify("same", "http://localhost:1"), template.clone()).unwrap();
        let b = Connector::new(dify("same", "http://localhost:2"), template).unwrap();
        assert!(EvaluationManager::new(vec![a, b], settings()).is_err());
    }
}
