//! Question set consumed by a benchmark run.
//!
//! Test cases arrive pre-parsed as an ordered list of
//! `{question, ground_truth, id?, contexts?, tags?}` records, either JSON or YAML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// A single benchmark question. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "text")]
    pub question: String,
    pub ground_truth: String,
    /// Reference contexts, in order.
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        ground_truth: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            ground_truth: ground_truth.into(),
            contexts: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }
}

/// Ordered, read-only question set shared by every phase of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Builds a set, assigning positional ids (`q1`, `q2`, ...) to questions without one.
    pub fn new(questions: Vec<Question>) -> Self {
        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(idx, mut q)| {
                if q.id.trim().is_empty() {
                    q.id = format!("q{}", idx + 1);
                }
                q
            })
            .collect();
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Question> {
        self.questions.get(idx)
    }

    pub fn texts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.question.clone()).collect()
    }

    pub fn ground_truths(&self) -> Vec<String> {
        self.questions
            .iter()
            .map(|q| q.ground_truth.clone())
            .collect()
    }

    pub fn reference_contexts(&self) -> Vec<Vec<String>> {
        self.questions.iter().map(|q| q.contexts.clone()).collect()
    }

    /// Parses a JSON array of test cases.
    pub fn from_json_str(raw: &str) -> Result<Self, BenchError> {
        let questions: Vec<Question> = serde_json::from_str(raw)
            .map_err(|err| BenchError::TestCases(format!("invalid JSON test cases: {err}")))?;
        Ok(Self::new(questions))
    }

    /// Parses a YAML sequence of test cases.
    pub fn from_yaml_str(raw: &str) -> Result<Self, BenchError> {
        let questions: Vec<Question> = serde_yaml::from_str(raw)
            .map_err(|err| BenchError::TestCases(format!("invalid YAML test cases: {err}")))?;
        Ok(Self::new(questions))
    }

    /// Loads test cases from disk; `.yaml`/`.yml` are read as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            BenchError::TestCases(format!("failed to read {}: {err}", path.display()))
        })?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let set = if is_yaml {
            Self::from_yaml_str(&raw)?
        } else {
            Self::from_json_str(&raw)?
        };
        log::info!("Loaded {} test cases from {}", set.len(), path.display());
        Ok(set)
    }
}

impl From<Vec<Question>> for QuestionSet {
    fn from(questions: Vec<Question>) -> Self {
        Self::new(questions)
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}
