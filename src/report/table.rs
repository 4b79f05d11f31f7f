use serde::Serialize;
use serde_json::{Map, Value};

use crate::evaluation::{ResultCube, SystemAnswers};
use crate::question::QuestionSet;

/// One column of the wide result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    Question,
    GroundTruth,
    Answer {
        system: String,
    },
    Score {
        system: String,
        evaluator: String,
        metric: String,
    },
}

impl Column {
    pub fn header(&self) -> String {
        match self {
            Column::Question => "question".to_string(),
            Column::GroundTruth => "ground_truth".to_string(),
            Column::Answer { system } => format!("{system}_answer"),
            Column::Score {
                system,
                evaluator,
                metric,
            } => format!("{system}_{evaluator}_{metric}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    /// `None` is an absent score.
    Score(Option<f64>),
}

impl From<&Cell> for Value {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Text(text) => Value::String(text.clone()),
            Cell::Score(Some(score)) => serde_json::Number::from_f64(*score)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Score(None) => Value::Null,
        }
    }
}

/// Rectangular record set: one row per question, one column per question field,
/// system answer and (system, evaluator, metric) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    /// Flattens answers and the cube. Column order: question, ground truth, every
    /// system's answer, then scores grouped by evaluator and system.
    pub fn assemble(
        questions: &QuestionSet,
        answers: &[SystemAnswers],
        cube: &ResultCube,
    ) -> Self {
        let mut columns = vec![Column::Question, Column::GroundTruth];
        let answer_texts: Vec<Vec<String>> = answers.iter().map(SystemAnswers::answers).collect();
        columns.extend(answers.iter().map(|a| Column::Answer {
            system: a.system.clone(),
        }));

        let mut score_columns = Vec::new();
        for (system, evaluator, record) in cube.iter() {
            for (metric, scores) in record.iter() {
                columns.push(Column::Score {
                    system: system.to_string(),
                    evaluator: evaluator.to_string(),
                    metric: metric.to_string(),
                });
                score_columns.push(scores);
            }
        }

        let rows = questions
            .iter()
            .enumerate()
            .map(|(idx, question)| {
                let mut row = Vec::with_capacity(columns.len());
                row.push(Cell::Text(question.question.clone()));
                row.push(Cell::Text(question.ground_truth.clone()));
                for texts in &answer_texts {
                    row.push(Cell::Text(texts.get(idx).cloned().unwrap_or_default()));
                }
                for scores in &score_columns {
                    row.push(Cell::Score(scores.get(idx).copied().flatten()));
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(Column::header).collect()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Scores in one column, or `None` for a non-score column index.
    pub fn score_column(&self, idx: usize) -> Option<Vec<Option<f64>>> {
        match self.columns.get(idx)? {
            Column::Score { .. } => Some(
                self.rows
                    .iter()
                    .map(|row| match row.get(idx) {
                        Some(Cell::Score(score)) => *score,
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Wide records keyed by header; absent scores are `null`.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        let headers = self.headers();
        self.rows
            .iter()
            .map(|row| {
                headers
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Value::from))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::QueryResult;
    use crate::evaluator::ScoreRecord;
    use crate::question::Question;

    fn fixture() -> (QuestionSet, Vec<SystemAnswers>, ResultCube) {
        let questions = QuestionSet::new(vec![
            Question::new("", "What is Rust?", "A language"),
            Question::new("", "Who maintains it?", "The Rust project"),
        ]);
        let answers = vec![
            SystemAnswers {
                system: "dify".to_string(),
                results: vec![
                    QueryResult {
                        answer: "A systems language".to_string(),
                        ..QueryResult::default()
                    },
                    QueryResult::failed("Request failed after 3 attempts: HTTP status 500: "),
                ],
                elapsed_ms: 0,
            },
            SystemAnswers {
                system: "ragflow".to_string(),
                results: vec![QueryResult::default(), QueryResult::default()],
                elapsed_ms: 0,
            },
        ];

        let mut cube = ResultCube::new();
        let mut dify = ScoreRecord::new();
        dify.insert("relevancy", vec![Some(0.8), None]);
        dify.insert("correctness", vec![Some(0.6), None]);
        cube.insert("dify", "academic", dify).unwrap();
        cube.insert(
            "ragflow",
            "academic",
            ScoreRecord::absent(&["relevancy", "correctness"], 2),
        )
        .unwrap();
        (questions, answers, cube)
    }

    #[test]
    fn one_row_per_question_and_one_column_per_triple() {
        let (questions, answers, cube) = fixture();
        let table = ResultTable::assemble(&questions, &answers, &cube);

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.headers(),
            vec![
                "question",
                "ground_truth",
                "dify_answer",
                "ragflow_answer",
                "dify_academic_correctness",
                "dify_academic_relevancy",
                "ragflow_academic_correctness",
                "ragflow_academic_relevancy",
            ]
        );
        assert!(table.rows().iter().all(|row| row.len() == 8));
    }

    #[test]
    fn failed_answers_are_empty_and_absent_scores_are_null() {
        let (questions, answers, cube) = fixture();
        let records = ResultTable::assemble(&questions, &answers, &cube).records();

        assert_eq!(records[0]["dify_answer"], "A systems language");
        assert_eq!(records[1]["dify_answer"], "");
        assert_eq!(records[0]["dify_academic_relevancy"], 0.8);
        assert_eq!(records[1]["dify_academic_relevancy"], Value::Null);
        assert_eq!(records[0]["ragflow_academic_correctness"], Value::Null);
    }

    #[test]
    fn score_column_reads_back_scores() {
        let (questions, answers, cube) = fixture();
        let table = ResultTable::assemble(&questions, &answers, &cube);
        assert_eq!(table.score_column(5), Some(vec![Some(0.8), None]));
        assert_eq!(table.score_column(0), None);
    }
}
