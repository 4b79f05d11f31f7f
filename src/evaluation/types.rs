use serde::Serialize;

use crate::connector::QueryResult;
use crate::report::ResultTable;

use super::cube::ResultCube;

/// Query-phase output for one system, aligned to question order.
#[derive(Debug, Clone, Serialize)]
pub struct SystemAnswers {
    pub system: String,
    pub results: Vec<QueryResult>,
    /// Wall time spent querying this system, pacing included.
    pub elapsed_ms: u128,
}

impl SystemAnswers {
    /// Answer texts; failed queries contribute an empty string.
    pub fn answers(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|result| {
                if result.is_error() {
                    String::new()
                } else {
                    result.answer.clone()
                }
            })
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

/// A configured system left out of the run at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedSystem {
    pub name: String,
    pub reason: String,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub answers: Vec<SystemAnswers>,
    pub cube: ResultCube,
    pub table: ResultTable,
}
