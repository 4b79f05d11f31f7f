use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::BenchError;
use crate::evaluation::{ExcludedSystem, RunOutcome};
use crate::evaluator::EvaluatorInfo;
use crate::question::QuestionSet;

use super::summary::Summary;

pub const RESULTS_FILE_NAME: &str = "multi_evaluation_results.json";

/// A question a system could not answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub system: String,
    pub question_id: String,
    pub error: String,
}

/// Everything handed to a persistence collaborator after a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub systems: Vec<String>,
    pub excluded: Vec<ExcludedSystem>,
    pub evaluators: Vec<EvaluatorInfo>,
    pub columns: Vec<String>,
    pub records: Vec<Map<String, Value>>,
    pub errors: Vec<QueryFailure>,
    pub summary: Summary,
}

impl RunReport {
    pub fn new(
        questions: &QuestionSet,
        outcome: &RunOutcome,
        evaluators: Vec<EvaluatorInfo>,
        excluded: Vec<ExcludedSystem>,
    ) -> Self {
        let errors = outcome
            .answers
            .iter()
            .flat_map(|system| {
                system
                    .results
                    .iter()
                    .zip(questions.iter())
                    .filter_map(move |(result, question)| {
                        result.error.as_ref().map(|error| QueryFailure {
                            system: system.system.clone(),
                            question_id: question.id.clone(),
                            error: error.clone(),
                        })
                    })
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            systems: outcome.answers.iter().map(|a| a.system.clone()).collect(),
            excluded,
            evaluators,
            columns: outcome.table.headers(),
            records: outcome.table.records(),
            errors,
            summary: Summary::from_run(&outcome.answers, &outcome.cube),
        }
    }
}

/// Consumer of a finished run.
pub trait ReportSink {
    /// Persists the report and returns where it went.
    fn write(&self, report: &RunReport) -> Result<PathBuf, BenchError>;
}

/// Writes the report as pretty JSON into an output directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReportSink for JsonFileSink {
    fn write(&self, report: &RunReport) -> Result<PathBuf, BenchError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(RESULTS_FILE_NAME);
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json)?;
        log::info!("Wrote results to {}", path.display());
        Ok(path)
    }
}
