use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;

use crate::error::BenchError;

use super::config::EvaluatorConfig;
use super::registry::EvaluatorRegistry;
use super::score::ScoreRecord;
use super::traits::{Evaluator, EvaluatorInfo};

/// Per-evaluator records for one system, in evaluator order.
pub type EvaluationResults = Vec<(String, ScoreRecord)>;

/// Runs the realized evaluators over one system's answers at a time.
pub struct EvaluatorManager {
    evaluators: Vec<(String, Box<dyn Evaluator>)>,
    timeout: Option<Duration>,
}

impl EvaluatorManager {
    pub fn new(evaluators: Vec<(String, Box<dyn Evaluator>)>) -> Result<Self, BenchError> {
        if evaluators.is_empty() {
            return Err(BenchError::configuration(
                "evaluators",
                vec!["no evaluator could be initialized".to_string()],
            ));
        }
        Ok(Self {
            evaluators,
            timeout: None,
        })
    }

    pub async fn from_registry(
        registry: &EvaluatorRegistry,
        config: Arc<EvaluatorConfig>,
        types: Option<&[String]>,
    ) -> Result<Self, BenchError> {
        let evaluators = registry.create_all(config, types).await?;
        log::info!(
            "Initialized {} evaluator(s): {}",
            evaluators.len(),
            evaluators
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self::new(evaluators)
    }

    /// Bounds each evaluator call; an expired call counts as a failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.evaluators.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    pub fn summary(&self) -> Vec<EvaluatorInfo> {
        self.evaluators
            .iter()
            .map(|(name, evaluator)| EvaluatorInfo {
                name: name.clone(),
                ..evaluator.info()
            })
            .collect()
    }

    /// Scores one system's answers with every evaluator.
    ///
    /// Never fails: an evaluator that errors, panics or times out gets an
    /// absent-filled record for its metrics while the others keep their scores.
    pub async fn evaluate_all(
        &self,
        questions: &[String],
        answers: &[String],
        ground_truths: &[String],
        contexts: Option<&[Vec<String>]>,
    ) -> EvaluationResults {
        let runs = self.evaluators.iter().map(|(name, evaluator)| async move {
            let record = self
                .run_one(evaluator.as_ref(), questions, answers, ground_truths, contexts)
                .await
                .unwrap_or_else(|err| {
                    log::error!("Evaluator {name} failed: {err}");
                    ScoreRecord::absent(evaluator.supported_metrics(), answers.len())
                });
            (name.clone(), record)
        });
        join_all(runs).await
    }

    async fn run_one(
        &self,
        evaluator: &dyn Evaluator,
        questions: &[String],
        answers: &[String],
        ground_truths: &[String],
        contexts: Option<&[Vec<String>]>,
    ) -> Result<ScoreRecord, BenchError> {
        let call = AssertUnwindSafe(evaluator.evaluate_answers(
            questions,
            answers,
            ground_truths,
            contexts,
        ))
        .catch_unwind();

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                BenchError::JudgeError(format!("evaluation timed out after {limit:?}"))
            })?,
            None => call.await,
        };

        let record = outcome
            .map_err(|_| BenchError::JudgeError("evaluator panicked".to_string()))??;
        record.conform(evaluator.supported_metrics(), answers.len())
    }
}
