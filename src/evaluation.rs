#[path = "evaluation/settings.rs"]
mod settings;

#[path = "evaluation/cube.rs"]
mod cube;

#[path = "evaluation/types.rs"]
mod types;

#[path = "evaluation/engine.rs"]
mod engine;

pub use cube::ResultCube;
pub use engine::EvaluationManager;
pub use settings::{RunSettings, DEFAULT_PACING_MS};
pub use types::{ExcludedSystem, RunOutcome, SystemAnswers};
