use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BenchError;

use super::config::{EvaluatorConfig, ParseFailurePolicy};
use super::judge::{parse_bare_score, JudgeClient, OpenAICompatibleJudge};
use super::score::{eval_items, EvalItem, ScoreRecord};
use super::traits::Evaluator;

const METRICS: &[&str] = &["relevancy", "correctness"];

/// One judge call per metric, each answered with a bare number.
pub struct SimpleEvaluator {
    judge: Option<Arc<dyn JudgeClient>>,
    policy: ParseFailurePolicy,
}

impl SimpleEvaluator {
    pub fn new(judge: Arc<dyn JudgeClient>, policy: ParseFailurePolicy) -> Self {
        Self {
            judge: Some(judge),
            policy,
        }
    }

    pub fn from_config(config: &EvaluatorConfig) -> Self {
        let judge = match OpenAICompatibleJudge::new(&config.judge) {
            Ok(judge) => Some(Arc::new(judge) as Arc<dyn JudgeClient>),
            Err(err) => {
                log::warn!("simple evaluator unavailable: {err}");
                None
            }
        };
        Self {
            judge,
            policy: config.parse_failure,
        }
    }

    async fn ask(&self, judge: &dyn JudgeClient, metric: &str, prompt: String) -> Option<f64> {
        match judge.judge(&prompt).await {
            Ok(reply) => parse_bare_score(&reply).or_else(|| {
                log::warn!("simple {metric}: no score in judge reply {reply:?}");
                self.policy.fallback()
            }),
            Err(err) => {
                log::warn!("simple {metric}: judge call failed: {err}");
                self.policy.fallback()
            }
        }
    }
}

fn relevancy_prompt(item: &EvalItem<'_>) -> String {
    format!(
        "Rate how relevant the answer is to the question on a scale from 0.0 to 1.0.\n\n\
         Question: {}\nAnswer: {}\n\n\
         1.0 fully relevant, 0.8 mostly, 0.6 partially, 0.4 slightly, 0.2 barely, 0.0 not at all.\n\
         Reply with the score only (for example: 0.8).",
        item.question, item.answer
    )
}

fn correctness_prompt(item: &EvalItem<'_>) -> String {
    format!(
        "Compare the answer with the reference answer and rate its correctness from 0.0 to 1.0.\n\n\
         Question: {}\nAnswer: {}\nReference answer: {}\n\n\
         1.0 matches completely, 0.8 mostly, 0.6 partially, 0.4 slightly, 0.2 barely, 0.0 not at all.\n\
         Reply with the score only (for example: 0.8).",
        item.question, item.answer, item.ground_truth
    )
}

#[async_trait]
impl Evaluator for SimpleEvaluator {
    fn name(&self) -> &str {
        "simple"
    }

    fn supported_metrics(&self) -> &[&'static str] {
        METRICS
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
        let mut record = ScoreRecord::absent(METRICS, items.len());
        let Some(judge) = self.judge.as_deref() else {
            return Ok(record);
        };

        for item in items.iter().filter(|item| !item.is_blank()) {
            let relevancy = self.ask(judge, "relevancy", relevancy_prompt(item)).await;
            let correctness = self
                .ask(judge, "correctness", correctness_prompt(item))
                .await;
            record.set("relevancy", item.index, relevancy);
            record.set("correctness", item.index, correctness);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedJudge {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JudgeClient for FixedJudge {
        async fn judge(&self, _prompt: &str) -> Result<String, BenchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn scores_each_metric_with_its_own_call() {
        let judge = Arc::new(FixedJudge {
            reply: "0.7",
            calls: AtomicUsize::new(0),
        });
        let evaluator = SimpleEvaluator::new(judge.clone(), ParseFailurePolicy::Absent);

        let record = evaluator
            .evaluate_answers(
                &strings(&["q1", "q2", "q3"]),
                &strings(&["a1", "", "a3"]),
                &strings(&["g1", "g2", "g3"]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(judge.calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            record.get("relevancy").unwrap(),
            &[Some(0.7), None, Some(0.7)]
        );
        assert_eq!(
            record.get("correctness").unwrap(),
            &[Some(0.7), None, Some(0.7)]
        );
    }

    #[tokio::test]
    async fn unreadable_reply_uses_worst_policy() {
        let judge = Arc::new(FixedJudge {
            reply: "excellent",
            calls: AtomicUsize::new(0),
        });
        let evaluator = SimpleEvaluator::new(judge, ParseFailurePolicy::Worst);

        let record = evaluator
            .evaluate_answers(&strings(&["q"]), &strings(&["a"]), &strings(&["g"]), None)
            .await
            .unwrap();
        assert_eq!(record.get("relevancy").unwrap(), &[Some(0.0)]);
    }

    #[tokio::test]
    async fn fraction_reply_is_not_a_score() {
        let judge = Arc::new(FixedJudge {
            reply: "8/10",
            calls: AtomicUsize::new(0),
        });
        let evaluator = SimpleEvaluator::new(judge, ParseFailurePolicy::Absent);

        let record = evaluator
            .evaluate_answers(&strings(&["q"]), &strings(&["a"]), &strings(&["g"]), None)
            .await
            .unwrap();
        assert_eq!(record.get("relevancy").unwrap(), &[None]);
        assert_eq!(record.get("correctness").unwrap(), &[None]);
    }

    #[tokio::test]
    async fn unavailable_evaluator_returns_absent_record() {
        let evaluator = SimpleEvaluator::from_config(&EvaluatorConfig::default());
        assert!(!evaluator.is_available());

        let record = evaluator
            .evaluate_answers(&strings(&["q"]), &strings(&["a"]), &strings(&["g"]), None)
            .await
            .unwrap();
        assert_eq!(record.get("correctness").unwrap(), &[None]);
    }
}
