//! Embedding-similarity evaluator.
//!
//! `relevancy` is the cosine similarity between question and answer vectors,
//! `correctness` the one between answer and reference answer. Negative
//! similarities clamp to 0.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BenchError;

use super::config::EvaluatorConfig;
use super::embedding::{cosine_similarity, EmbeddingClient, OllamaEmbeddings};
use super::score::{clamp_score, eval_items, ScoreRecord};
use super::traits::Evaluator;

const METRICS: &[&str] = &["relevancy", "correctness"];
const PROBE_INPUT: &str = "test";

pub struct SimilarityEvaluator {
    client: Option<Arc<dyn EmbeddingClient>>,
}

impl SimilarityEvaluator {
    /// Wraps a client without probing it.
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Probes the client with one embedding; an empty or failed probe leaves the
    /// evaluator unavailable.
    pub async fn connect(client: Arc<dyn EmbeddingClient>) -> Self {
        match client.embed(vec![PROBE_INPUT.to_string()]).await {
            Ok(vectors) if vectors.first().is_some_and(|v| !v.is_empty()) => Self::new(client),
            Ok(_) => {
                log::warn!("embedding evaluator unavailable: probe returned no vector");
                Self { client: None }
            }
            Err(err) => {
                log::warn!("embedding evaluator unavailable: {err}");
                Self { client: None }
            }
        }
    }

    pub async fn from_config(config: &EvaluatorConfig) -> Self {
        match OllamaEmbeddings::new(&config.embedding) {
            Ok(client) => {
                log::info!("embedding evaluator using model {}", client.model());
                Self::connect(Arc::new(client)).await
            }
            Err(err) => {
                log::warn!("embedding evaluator unavailable: {err}");
                Self { client: None }
            }
        }
    }
}

#[async_trait]
impl Evaluator for SimilarityEvaluator {
    fn name(&self) -> &str {
        "embedding"
    }

    fn supported_metrics(&self) -> &[&'static str] {
        METRICS
    }

    fn is_available(&self) -> bool {
        self.client.is_some()
    }

    async fn evaluate_answers(
        &self,
        questions: &[String],
        answers: &[String],
        ground_truths: &[String],
        contexts: Option<&[Vec<String>]>,
    ) -> Result<ScoreRecord, BenchError> {
        let items = eval_items(questions, answers, ground_truths, contexts)?;
        let mut record = ScoreRecord::absent(METRICS, items.len());
        let Some(client) = self.client.as_deref() else {
            return Ok(record);
        };

        let scored: Vec<_> = items.iter().filter(|item| !item.is_blank()).collect();
        if scored.is_empty() {
            return Ok(record);
        }

        // One batch: [q, a, gt] per scored item.
        let input = scored
            .iter()
            .flat_map(|item| [item.question, item.answer, item.ground_truth])
            .map(str::to_string)
            .collect();
        let vectors = client.embed(input).await?;
        if vectors.len() != 3 * scored.len() {
            return Err(BenchError::JudgeError(format!(
                "expected {} embeddings, got {}",
                3 * scored.len(),
                vectors.len()
            )));
        }

        for (item, triple) in scored.iter().zip(vectors.chunks_exact(3)) {
            let [question, answer, truth] = triple else {
                continue;
            };
            let relevancy = cosine_similarity(question, answer).and_then(clamp_score);
            let correctness = cosine_similarity(answer, truth).and_then(clamp_score);
            record.set("relevancy", item.index, relevancy);
            record.set("correctness", item.index, correctness);
        }
        Ok(record)
    }
}
