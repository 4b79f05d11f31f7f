use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::Serialize;

use crate::error::BenchError;

use super::config::EvaluatorConfig;
use super::lexical::LexicalEvaluator;
use super::rubric::{RubricEvaluator, ACADEMIC_RUBRIC, FAITHFULNESS_RUBRIC};
use super::similarity::SimilarityEvaluator;
use super::simple::SimpleEvaluator;
use super::traits::Evaluator;

/// Evaluator types activated when no explicit list is given.
pub const DEFAULT_PRIORITY: &[&str] = &["academic", "lexical"];

pub type EvaluatorFuture = BoxFuture<'static, Result<Box<dyn Evaluator>, BenchError>>;

/// Builds one evaluator type from shared settings.
pub type EvaluatorConstructor = Arc<dyn Fn(Arc<EvaluatorConfig>) -> EvaluatorFuture + Send + Sync>;

struct RegistryEntry {
    description: String,
    constructor: EvaluatorConstructor,
}

/// Registered evaluator type with its human-readable description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatorDescription {
    pub name: String,
    pub description: String,
}

/// Table of evaluator types by name plus the default activation order.
pub struct EvaluatorRegistry {
    entries: BTreeMap<String, RegistryEntry>,
    priority: Vec<String>,
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EvaluatorRegistry {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            priority: Vec::new(),
        }
    }

    /// Registry with every built-in evaluator type.
    pub fn builtin() -> Self {
        Self::empty()
            .register(
                "academic",
                "LLM rubric scoring relevancy, correctness, completeness and clarity",
                |config| async move {
                    Ok(Box::new(RubricEvaluator::from_config(&ACADEMIC_RUBRIC, &config))
                        as Box<dyn Evaluator>)
                },
            )
            .register(
                "faithfulness",
                "LLM rubric judging answers against the retrieved contexts",
                |config| async move {
                    Ok(
                        Box::new(RubricEvaluator::from_config(&FAITHFULNESS_RUBRIC, &config))
                            as Box<dyn Evaluator>,
                    )
                },
            )
            .register(
                "simple",
                "Direct LLM scoring of relevancy and correctness",
                |config| async move {
                    Ok(Box::new(SimpleEvaluator::from_config(&config)) as Box<dyn Evaluator>)
                },
            )
            .register(
                "embedding",
                "Embedding cosine similarity against question and ground truth",
                |config| async move {
                    Ok(Box::new(SimilarityEvaluator::from_config(&config).await)
                        as Box<dyn Evaluator>)
                },
            )
            .register(
                "lexical",
                "Token overlap with the ground truth, no external service",
                |_config| async move { Ok(Box::new(LexicalEvaluator::new()) as Box<dyn Evaluator>) },
            )
            .with_priority(DEFAULT_PRIORITY.iter().copied())
    }

    /// Adds or replaces an evaluator type.
    pub fn register<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        constructor: F,
    ) -> Self
    where
        F: Fn(Arc<EvaluatorConfig>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Box<dyn Evaluator>, BenchError>> + Send + 'static,
    {
        let constructor: EvaluatorConstructor = Arc::new(move |config| constructor(config).boxed());
        self.entries.insert(
            name.into(),
            RegistryEntry {
                description: description.into(),
                constructor,
            },
        );
        self
    }

    pub fn with_priority<I, S>(mut self, priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.priority = priority.into_iter().map(Into::into).collect();
        self
    }

    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn descriptions(&self) -> Vec<EvaluatorDescription> {
        self.entries
            .iter()
            .map(|(name, entry)| EvaluatorDescription {
                name: name.clone(),
                description: entry.description.clone(),
            })
            .collect()
    }

    /// Constructs one evaluator type.
    ///
    /// Returns `Ok(None)` when construction fails, panics or yields an unavailable
    /// evaluator; only an unregistered type name is an error.
    pub async fn create(
        &self,
        evaluator_type: &str,
        config: Arc<EvaluatorConfig>,
    ) -> Result<Option<Box<dyn Evaluator>>, BenchError> {
        let entry = self
            .entries
            .get(evaluator_type)
            .ok_or_else(|| BenchError::UnknownEvaluator(evaluator_type.to_string()))?;

        let constructor = entry.constructor.clone();
        let built = AssertUnwindSafe(async move { constructor(config).await })
            .catch_unwind()
            .await;

        match built {
            Ok(Ok(evaluator)) if evaluator.is_available() => {
                log::info!("Evaluator {evaluator_type} ready");
                Ok(Some(evaluator))
            }
            Ok(Ok(_)) => {
                log::warn!("Evaluator {evaluator_type} is unavailable, leaving it out of the run");
                Ok(None)
            }
            Ok(Err(err)) => {
                log::warn!("Evaluator {evaluator_type} failed to initialize: {err}");
                Ok(None)
            }
            Err(_) => {
                log::error!("Evaluator {evaluator_type} panicked during construction");
                Ok(None)
            }
        }
    }

    /// Constructs every requested type (the priority list when `types` is `None`)
    /// concurrently, keeping request order and skipping types that fail.
    pub async fn create_all(
        &self,
        config: Arc<EvaluatorConfig>,
        types: Option<&[String]>,
    ) -> Result<Vec<(String, Box<dyn Evaluator>)>, BenchError> {
        let requested = types.unwrap_or(self.priority.as_slice());
        let mut names: Vec<&str> = Vec::with_capacity(requested.len());
        for name in requested {
            if !self.contains(name) {
                return Err(BenchError::UnknownEvaluator(name.clone()));
            }
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }

        let built = join_all(names.iter().map(|name| self.create(name, config.clone()))).await;

        let mut realized = Vec::new();
        for (name, result) in names.into_iter().zip(built) {
            if let Some(evaluator) = result? {
                realized.push((name.to_string(), evaluator));
            }
        }
        Ok(realized)
    }
}
