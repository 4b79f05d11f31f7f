//! LLM-judged multi-dimension rubric evaluators.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BenchError;

use super::config::{EvaluatorConfig, ParseFailurePolicy};
use super::judge::{metric_score, parse_score_object, JudgeClient, OpenAICompatibleJudge};
use super::score::{eval_items, EvalItem, ScoreRecord};
use super::traits::Evaluator;

/// One scored dimension of a rubric.
#[derive(Debug)]
pub struct RubricMetric {
    pub name: &'static str,
    pub criterion: &'static str,
}

/// Scoring instructions sent to the judge, one JSON score object per item.
#[derive(Debug)]
pub struct Rubric {
    pub name: &'static str,
    pub metrics: &'static [RubricMetric],
    /// Whether the retrieved contexts are shown to the judge.
    pub uses_contexts: bool,
}

pub static ACADEMIC_RUBRIC: Rubric = Rubric {
    name: "academic",
    metrics: &[
        RubricMetric {
            name: "relevancy",
            criterion: "How directly the answer addresses the question.",
        },
        RubricMetric {
            name: "correctness",
            criterion: "How well the answer agrees with the reference answer.",
        },
        RubricMetric {
            name: "completeness",
            criterion: "Whether the answer gives all the information the question needs.",
        },
        RubricMetric {
            name: "clarity",
            criterion: "How clear and easy to follow the answer is.",
        },
    ],
    uses_contexts: false,
};

pub static FAITHFULNESS_RUBRIC: Rubric = Rubric {
    name: "faithfulness",
    metrics: &[
        RubricMetric {
            name: "relevancy",
            criterion: "How directly the answer addresses the question without digressions.",
        },
        RubricMetric {
            name: "correctness",
            criterion: "Factual agreement with the reference answer.",
        },
        RubricMetric {
            name: "faithfulness",
            criterion: "Whether every claim is supported by the retrieved context, with no hallucinated facts.",
        },
    ],
    uses_contexts: true,
};

const SCORE_BANDS: &str = "1.0 fully meets the criterion, 0.8 mostly, 0.6 partially, \
0.4 slightly, 0.2 barely, 0.0 not at all.";

/// Evaluator that asks an LLM judge to grade every answer against a [`Rubric`].
pub struct RubricEvaluator {
    rubric: &'static Rubric,
    metric_names: Vec<&'static str>,
    judge: Option<Arc<dyn JudgeClient>>,
    policy: ParseFailurePolicy,
}

impl RubricEvaluator {
    pub fn new(
        rubric: &'static Rubric,
        judge: Arc<dyn JudgeClient>,
        policy: ParseFailurePolicy,
    ) -> Self {
        Self {
            rubric,
            metric_names: rubric.metrics.iter().map(|m| m.name).collect(),
            judge: Some(judge),
            policy,
        }
    }

    /// Builds the judge from config; a bad judge config leaves the evaluator unavailable.
    pub fn from_config(rubric: &'static Rubric, config: &EvaluatorConfig) -> Self {
        match OpenAICompatibleJudge::new(&config.judge) {
            Ok(judge) => {
                log::info!("{} evaluator using judge model {}", rubric.name, judge.model());
                Self::new(rubric, Arc::new(judge), config.parse_failure)
            }
            Err(err) => {
                log::warn!("{} evaluator unavailable: {err}", rubric.name);
                Self {
                    rubric,
                    metric_names: rubric.metrics.iter().map(|m| m.name).collect(),
                    judge: None,
                    policy: config.parse_failure,
                }
            }
        }
    }

    fn prompt(&self, item: &EvalItem<'_>) -> String {
        let mut prompt = format!(
            "You are an expert evaluator of retrieval-augmented question answering systems.\n\
             Grade the answer below on each criterion with a score between 0.0 and 1.0.\n\n\
             Question: {}\n\n\
             Answer: {}\n\n\
             Reference answer: {}\n\n",
            item.question, item.answer, item.ground_truth
        );
        if self.rubric.uses_contexts {
            let context = if item.contexts.is_empty() {
                "(no context available)".to_string()
            } else {
                item.contexts.join("\n")
            };
            prompt.push_str(&format!("Retrieved context: {context}\n\n"));
        }

        prompt.push_str("Criteria:\n");
        for metric in self.rubric.metrics {
            prompt.push_str(&format!("- {}: {}\n", metric.name, metric.criterion));
        }

        let example = self
            .rubric
            .metrics
            .iter()
            .map(|m| format!("\"{}\": 0.8", m.name))
            .collect::<Vec<_>>()
            .join(", ");
        prompt.push_str(&format!(
            "\nScale: {SCORE_BANDS}\n\n\
             Reply with a single JSON object and nothing else, for example: {{{example}}}"
        ));
        prompt
    }

    async fn score_item(
        &self,
        judge: &dyn JudgeClient,
        item: &EvalItem<'_>,
        record: &mut ScoreRecord,
    ) {
        let verdict = match judge.judge(&self.prompt(item)).await {
            Ok(reply) => {
                let parsed = parse_score_object(&reply);
                if parsed.is_none() {
                    log::warn!(
                        "{} could not parse judge reply for item {}: {reply}",
                        self.rubric.name,
                        item.index
                    );
                }
                parsed
            }
            Err(err) => {
                log::warn!(
                    "{} judge call failed for item {}: {err}",
                    self.rubric.name,
                    item.index
                );
                None
            }
        };

        for metric in &self.metric_names {
            let score = verdict
                .as_ref()
                .and_then(|object| metric_score(object, metric))
                .or_else(|| self.policy.fallback());
            record.set(metric, item.index, score);
        }
    }
}

#[async_trait]
impl Evaluator for RubricEvaluator {
    fn name(&self) -> &str {
        self.rubric.name
    }

    fn supported_metrics(&self) -> &[&'static str] {
        &self.metric_names
    }

    fn is_available(&self) -> bool {
        self.judge.is_some()
    }

    async fn evaluate_answers(
        &self,
        questions: &[String],
        answers: &[String],
        ground_truths: &[String],
        contexts: Option<&[Vec<String>]>,
    ) -> Result<ScoreRecord, BenchError> {
        let items = eval_items(questions, answers, ground_truths, contexts)?;
        let mut record = ScoreRecord::absent(&self.metric_names, items.len());
        let Some(judge) = self.judge.as_deref() else {
            return Ok(record);
        };

        for item in items.iter().filter(|item| !item.is_blank()) {
            self.score_item(judge, item, &mut record).await;
        }
        Ok(record)
    }
}
