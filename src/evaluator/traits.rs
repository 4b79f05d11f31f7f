use async_trait::async_trait;
use serde::Serialize;

use crate::error::BenchError;

use super::score::ScoreRecord;

/// Pluggable scoring strategy.
///
/// Implementations differ only in how they score; the evaluation engine drives
/// every variant through this contract.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    /// Metrics this evaluator produces, in a fixed order.
    fn supported_metrics(&self) -> &[&'static str];

    /// Resolved at construction; an unavailable evaluator is left out of the run.
    fn is_available(&self) -> bool;

    /// Scores one system's answers.
    ///
    /// All slices are aligned to question order. The returned record holds one score
    /// sequence per supported metric, each as long as `answers`. Blank answers must be
    /// scored absent without calling the scoring dependency.
    async fn evaluate_answers(
        &self,
        questions: &[String],
        answers: &[String],
        ground_truths: &[String],
        contexts: Option<&[Vec<String>]>,
    ) -> Result<ScoreRecord, BenchError>;

    fn info(&self) -> EvaluatorInfo {
        EvaluatorInfo {
            name: self.name().to_string(),
            supported_metrics: self
                .supported_metrics()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            available: self.is_available(),
        }
    }
}

/// Descriptor of a realized evaluator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorInfo {
    pub name: String,
    pub supported_metrics: Vec<String>,
    pub available: bool,
}
