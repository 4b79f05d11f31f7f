use std::collections::BTreeMap;

use crate::error::BenchError;
use crate::evaluator::ScoreRecord;

/// (system, evaluator) to [`ScoreRecord`] mapping built during the score phase.
///
/// Every cell is written at most once. Systems and evaluators keep the order in
/// which they first appeared so the assembled table is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultCube {
    systems: Vec<String>,
    evaluators: Vec<String>,
    cells: BTreeMap<(String, String), ScoreRecord>,
}

impl ResultCube {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one cell; a second write to the same cell is rejected.
    pub fn insert(
        &mut self,
        system: &str,
        evaluator: &str,
        record: ScoreRecord,
    ) -> Result<(), BenchError> {
        let key = (system.to_string(), evaluator.to_string());
        if self.cells.contains_key(&key) {
            return Err(BenchError::DuplicateCell {
                system: key.0,
                evaluator: key.1,
            });
        }
        if !self.systems.iter().any(|s| s == system) {
            self.systems.push(key.0.clone());
        }
        if !self.evaluators.iter().any(|e| e == evaluator) {
            self.evaluators.push(key.1.clone());
        }
        self.cells.insert(key, record);
        Ok(())
    }

    pub fn get(&self, system: &str, evaluator: &str) -> Option<&ScoreRecord> {
        self.cells
            .get(&(system.to_string(), evaluator.to_string()))
    }

    pub fn systems(&self) -> &[String] {
        &self.systems
    }

    pub fn evaluators(&self) -> &[String] {
        &self.evaluators
    }

    /// Cells in (evaluator, system) order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &ScoreRecord)> {
        self.evaluators.iter().flat_map(move |evaluator| {
            self.systems.iter().filter_map(move |system| {
                self.get(system, evaluator)
                    .map(|record| (system.as_str(), evaluator.as_str(), record))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
