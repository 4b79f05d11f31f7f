#[path = "evaluator/score.rs"]
mod score;

#[path = "evaluator/traits.rs"]
mod traits;

#[path = "evaluator/config.rs"]
mod config;

#[path = "evaluator/judge.rs"]
mod judge;

#[path = "evaluator/embedding.rs"]
mod embedding;

#[path = "evaluator/rubric.rs"]
mod rubric;

#[path = "evaluator/simple.rs"]
mod simple;

#[path = "evaluator/similarity.rs"]
mod similarity;

#[path = "evaluator/lexical.rs"]
mod lexical;

#[path = "evaluator/registry.rs"]
mod registry;

#[path = "evaluator/manager.rs"]
mod manager;

pub use config::{EmbeddingConfig, EvaluatorConfig, JudgeConfig, ParseFailurePolicy};
pub use embedding::{cosine_similarity, EmbeddingClient, OllamaEmbeddings};
pub use judge::{parse_bare_score, parse_score_object, JudgeClient, OpenAICompatibleJudge};
pub use lexical::LexicalEvaluator;
pub use manager::{EvaluationResults, EvaluatorManager};
pub use registry::{
    EvaluatorConstructor, EvaluatorDescription, EvaluatorFuture, EvaluatorRegistry,
    DEFAULT_PRIORITY,
};
pub use rubric::{Rubric, RubricEvaluator, RubricMetric, ACADEMIC_RUBRIC, FAITHFULNESS_RUBRIC};
pub use score::{clamp_score, eval_items, EvalItem, ScoreRecord, Scores};
pub use similarity::SimilarityEvaluator;
pub use simple::SimpleEvaluator;
pub use traits::{Evaluator, EvaluatorInfo};
