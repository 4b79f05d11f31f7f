use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::BenchError;

use super::score::{eval_items, ScoreRecord};
use super::traits::Evaluator;

const METRICS: &[&str] = &["token_f1", "exact_match"];

/// Token-overlap scoring against the reference answer; needs no external service.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalEvaluator;

impl LexicalEvaluator {
    pub fn new() -> Self {
        Self
    }
}

/// Lowercased ASCII alphanumeric runs; every other alphanumeric char (CJK and the
/// like) is its own token.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            word.push(ch.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }
        if ch.is_alphanumeric() {
            tokens.extend(ch.to_lowercase().map(String::from));
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

fn token_f1(answer: &[String], truth: &[String]) -> f64 {
    if answer.is_empty() || truth.is_empty() {
        return if answer.is_empty() && truth.is_empty() {
            1.0
        } else {
            0.0
        };
    }

    let mut remaining: HashMap<&str, usize> = HashMap::new();
    for token in truth {
        *remaining.entry(token.as_str()).or_default() += 1;
    }
    let mut overlap = 0usize;
    for token in answer {
        if let Some(count) = remaining.get_mut(token.as_str()) {
            if *count > 0 {
                *count -= 1;
                overlap += 1;
            }
        }
    }
    if overlap == 0 {
        return 0.0;
    }

    let precision = overlap as f64 / answer.len() as f64;
    let recall = overlap as f64 / truth.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

#[async_trait]
impl Evaluator for LexicalEvaluator {
    fn name(&self) -> &str {
        "lexical"
    }

    fn supported_metrics(&self) -> &[&'static str] {
        METRICS
    }

    fn is_available(&self) -> bool {
        true
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

        for item in items.iter().filter(|item| !item.is_blank()) {
            let answer = tokenize(item.answer);
            let truth = tokenize(item.ground_truth);
            let exact = if answer == truth { 1.0 } else { 0.0 };
            record.set("token_f1", item.index, Some(token_f1(&answer, &truth)));
            record.set("exact_match", item.index, Some(exact));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn tokenizes_ascii_words_and_cjk_chars() {
        assert_eq!(tokenize("Hello, World-42!"), vec!["hello", "world", "42"]);
        assert_eq!(tokenize("東京 is 首都"), vec!["東", "京", "is", "首", "都"]);
    }

    #[rstest]
    #[case("Paris", "paris", 1.0)]
    #[case("the capital is Paris", "Paris", 0.4)]
    #[case("Berlin", "Paris", 0.0)]
    fn f1_matches_token_overlap(#[case] answer: &str, #[case] truth: &str, #[case] expected: f64) {
        let score = token_f1(&tokenize(answer), &tokenize(truth));
        assert!((score - expected).abs() < 1e-9, "{answer} vs {truth}: {score}");
    }

    #[tokio::test]
    async fn blank_answers_stay_absent() {
        let q = vec!["q1".to_string(), "q2".to_string()];
        let a = vec!["Paris.".to_string(), String::new()];
        let g = vec!["paris".to_string(), "Rome".to_string()];

        let record = LexicalEvaluator::new()
            .evaluate_answers(&q, &a, &g, None)
            .await
            .unwrap();

        assert_eq!(record.get("exact_match").unwrap(), &[Some(1.0), None]);
        assert_eq!(record.get("token_f1").unwrap(), &[Some(1.0), None]);
    }
}
