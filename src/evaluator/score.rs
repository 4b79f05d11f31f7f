use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::BenchError;

/// Per-question scores for one metric. `None` means "could not score", which is
/// distinct from a score of `0.0`.
pub type Scores = Vec<Option<f64>>;

/// Metric name to question-aligned scores produced by one evaluator for one system.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoreRecord {
    metrics: BTreeMap<String, Scores>,
}

impl ScoreRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record with every metric absent for all `len` questions.
    pub fn absent(metrics: &[&str], len: usize) -> Self {
        Self {
            metrics: metrics
                .iter()
                .map(|metric| (metric.to_string(), vec![None; len]))
                .collect(),
        }
    }

    pub fn insert(&mut self, metric: impl Into<String>, scores: Scores) {
        self.metrics.insert(metric.into(), scores);
    }

    /// Writes a single score; ignored when the metric or index does not exist.
    pub fn set(&mut self, metric: &str, index: usize, score: Option<f64>) {
        if let Some(slot) = self
            .metrics
            .get_mut(metric)
            .and_then(|scores| scores.get_mut(index))
        {
            *slot = score;
        }
    }

    pub fn get(&self, metric: &str) -> Option<&[Option<f64>]> {
        self.metrics.get(metric).map(Vec::as_slice)
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.metrics
            .iter()
            .map(|(metric, scores)| (metric.as_str(), scores.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Shapes the record to exactly `metrics` x `len`.
    ///
    /// Undeclared metrics are dropped and missing ones absent-filled; a declared
    /// metric with the wrong length is an error.
    pub(crate) fn conform(mut self, metrics: &[&str], len: usize) -> Result<Self, BenchError> {
        let mut shaped = BTreeMap::new();
        for metric in metrics {
            let scores = self
                .metrics
                .remove(*metric)
                .unwrap_or_else(|| vec![None; len]);
            if scores.len() != len {
                return Err(BenchError::JudgeError(format!(
                    "metric {metric} has {} scores for {len} questions",
                    scores.len()
                )));
            }
            let scores = scores.into_iter().map(|s| s.and_then(clamp_score)).collect();
            shaped.insert(metric.to_string(), scores);
        }
        Ok(Self { metrics: shaped })
    }
}

/// Clamps into `[0, 1]`; NaN becomes absent.
pub fn clamp_score(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 1.0))
    }
}

/// One question/answer pair as seen by an evaluator.
#[derive(Debug, Clone, Copy)]
pub struct EvalItem<'a> {
    pub index: usize,
    pub question: &'a str,
    pub answer: &'a str,
    pub ground_truth: &'a str,
    pub contexts: &'a [String],
}

impl EvalItem<'_> {
    /// Blank answers are never sent to a scoring dependency.
    pub fn is_blank(&self) -> bool {
        self.answer.trim().is_empty()
    }
}

/// Zips the evaluator inputs, rejecting sequences of different lengths.
pub fn eval_items<'a>(
    questions: &'a [String],
    answers: &'a [String],
    ground_truths: &'a [String],
    contexts: Option<&'a [Vec<String>]>,
) -> Result<Vec<EvalItem<'a>>, BenchError> {
    let len = answers.len();
    let contexts_len = contexts.map_or(len, <[Vec<String>]>::len);
    if questions.len() != len || ground_truths.len() != len || contexts_len != len {
        return Err(BenchError::InvalidRequest(format!(
            "misaligned evaluation input: {} questions, {len} answers, {} ground truths, {contexts_len} contexts",
            questions.len(),
            ground_truths.len(),
        )));
    }

    Ok((0..len)
        .map(|index| EvalItem {
            index,
            question: &questions[index],
            answer: &answers[index],
            ground_truth: &ground_truths[index],
            contexts: contexts.map_or(&[][..], |ctx| ctx[index].as_slice()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.5, Some(0.5))]
    #[case(1.7, Some(1.0))]
    #[case(-0.2, Some(0.0))]
    #[case(f64::NAN, None)]
    fn clamps_scores(#[case] raw: f64, #[case] expected: Option<f64>) {
        assert_eq!(clamp_score(raw), expected);
    }

    #[test]
    fn conform_fills_missing_and_drops_extra_metrics() {
        let mut record = ScoreRecord::new();
        record.insert("relevancy", vec![Some(0.4), Some(1.4)]);
        record.insert("bonus", vec![Some(1.0), Some(1.0)]);

        let shaped = record.conform(&["relevancy", "correctness"], 2).unwrap();
        assert_eq!(shaped.get("relevancy").unwrap(), &[Some(0.4), Some(1.0)]);
        assert_eq!(shaped.get("correctness").unwrap(), &[None, None]);
        assert!(shaped.get("bonus").is_none());
    }

    #[test]
    fn conform_rejects_wrong_length() {
        let mut record = ScoreRecord::new();
        record.insert("relevancy", vec![Some(0.4)]);
        assert!(record.conform(&["relevancy"], 3).is_err());
    }

    #[test]
    fn eval_items_rejects_misaligned_input() {
        let questions = vec!["a".to_string(), "b".to_string()];
        let answers = vec!["x".to_string()];
        let truths = vec!["y".to_string(), "z".to_string()];
        assert!(eval_items(&questions, &answers, &truths, None).is_err());
    }

    #[test]
    fn eval_items_defaults_contexts() {
        let q = vec!["a".to_string()];
        let a = vec!["  ".to_string()];
        let g = vec!["b".to_string()];
        let items = eval_items(&q, &a, &g, None).unwrap();
        assert!(items[0].contexts.is_empty());
        assert!(items[0].is_blank());
    }
}
