//! Benchmark retrieval-augmented chat backends against a fixed question set.
//!
//! A run has three phases:
//!
//! 1. every active [`Connector`] answers every [`Question`], with bounded retry,
//! 2. every realized [`Evaluator`] scores every system's answers into a [`ResultCube`],
//! 3. the cube and the raw answers are flattened into a [`ResultTable`].
//!
//! Faults never escape a connector or an evaluator: they come back as empty
//! answers, error strings and absent scores, so the table is always complete.

pub mod config;
pub mod connector;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod health;
pub mod question;
pub mod report;
pub mod template;

pub use connector::{BackendConfig, Connector, QueryResult};
pub use error::BenchError;
pub use evaluation::{EvaluationManager, ResultCube, RunOutcome, RunSettings};
pub use evaluator::{Evaluator, EvaluatorManager, EvaluatorRegistry, ScoreRecord};
pub use question::{Question, QuestionSet};
pub use report::{ResultTable, RunReport};
pub use template::{Template, TemplateLibrary, TemplateProcessor};
