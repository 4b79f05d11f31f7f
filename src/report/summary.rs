use std::fmt;

use serde::Serialize;

use crate::evaluation::{ResultCube, SystemAnswers};

/// Qualitative band for a mean score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    Fair,
    Pass,
    NeedsImprovement,
    Unscored,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::Excellent => "excellent",
            Grade::Good => "good",
            Grade::Fair => "fair",
            Grade::Pass => "pass",
            Grade::NeedsImprovement => "needs improvement",
            Grade::Unscored => "unscored",
        };
        f.write_str(label)
    }
}

pub fn grade(score: Option<f64>) -> Grade {
    match score {
        None => Grade::Unscored,
        Some(s) if s >= 0.9 => Grade::Excellent,
        Some(s) if s >= 0.8 => Grade::Good,
        Some(s) if s >= 0.7 => Grade::Fair,
        Some(s) if s >= 0.6 => Grade::Pass,
        Some(_) => Grade::NeedsImprovement,
    }
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub evaluator: String,
    pub metric: String,
    /// Mean over scored items only.
    pub mean: Option<f64>,
    pub scored: usize,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSummary {
    pub system: String,
    pub questions: usize,
    pub answered: usize,
    pub failed: usize,
    pub metrics: Vec<MetricSummary>,
    /// Mean of the metric means.
    pub overall: Option<f64>,
    pub grade: Grade,
}

/// Per-system aggregate view of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub systems: Vec<SystemSummary>,
}

impl Summary {
    pub fn from_run(answers: &[SystemAnswers], cube: &ResultCube) -> Self {
        let systems = answers
            .iter()
            .map(|system| {
                let metrics: Vec<MetricSummary> = cube
                    .evaluators()
                    .iter()
                    .filter_map(|evaluator| {
                        cube.get(&system.system, evaluator)
                            .map(|record| (evaluator, record))
                    })
                    .flat_map(|(evaluator, record)| {
                        record.iter().map(move |(metric, scores)| {
                            let scored: Vec<f64> = scores.iter().flatten().copied().collect();
                            let mean = mean(scored.iter().copied());
                            MetricSummary {
                                evaluator: evaluator.clone(),
                                metric: metric.to_string(),
                                mean,
                                scored: scored.len(),
                                grade: grade(mean),
                            }
                        })
                    })
                    .collect();

                let overall = mean(metrics.iter().filter_map(|m| m.mean));
                SystemSummary {
                    system: system.system.clone(),
                    questions: system.results.len(),
                    answered: system.results.iter().filter(|r| r.has_answer()).count(),
                    failed: system.failures(),
                    metrics,
                    overall,
                    grade: grade(overall),
                }
            })
            .collect();
        Self { systems }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for system in &self.systems {
            writeln!(
                f,
                "{}: {}/{} answered, {} failed",
                system.system, system.answered, system.questions, system.failed
            )?;
            for metric in &system.metrics {
                match metric.mean {
                    Some(mean) => writeln!(
                        f,
                        "  {}.{}: {mean:.3} {} ({} scored)",
                        metric.evaluator, metric.metric, metric.grade, metric.scored
                    )?,
                    None => writeln!(f, "  {}.{}: {}", metric.evaluator, metric.metric, metric.grade)?,
                }
            }
            match system.overall {
                Some(overall) => writeln!(f, "  overall: {overall:.3} {}", system.grade)?,
                None => writeln!(f, "  overall: {}", system.grade)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::QueryResult;
    use crate::evaluator::ScoreRecord;
    use rstest::rstest;

    #[rstest]
    #[case(Some(0.95), Grade::Excellent)]
    #[case(Some(0.9), Grade::Excellent)]
    #[case(Some(0.85), Grade::Good)]
    #[case(Some(0.7), Grade::Fair)]
    #[case(Some(0.6), Grade::Pass)]
    #[case(Some(0.0), Grade::NeedsImprovement)]
    #[case(None, Grade::Unscored)]
    fn grades_follow_bands(#[case] score: Option<f64>, #[case] expected: Grade) {
        assert_eq!(grade(score), expected);
    }

    #[test]
    fn means_skip_absent_scores() {
        let answers = vec![SystemAnswers {
            system: "dify".to_string(),
            results: vec![
                QueryResult {
                    answer: "yes".to_string(),
                    ..QueryResult::default()
                },
                QueryResult::failed("boom"),
                QueryResult {
                    answer: "no".to_string(),
                    ..QueryResult::default()
                },
            ],
            elapsed_ms: 0,
        }];
        let mut record = ScoreRecord::new();
        record.insert("relevancy", vec![Some(1.0), None, Some(0.5)]);
        record.insert("correctness", vec![None, None, None]);
        let mut cube = ResultCube::new();
        cube.insert("dify", "academic", record).unwrap();

        let summary = Summary::from_run(&answers, &cube);
        let system = &summary.systems[0];
        assert_eq!(system.answered, 2);
        assert_eq!(system.failed, 1);

        let relevancy = system
            .metrics
            .iter()
            .find(|m| m.metric == "relevancy")
            .unwrap();
        assert_eq!(relevancy.mean, Some(0.75));
        assert_eq!(relevancy.scored, 2);
        assert_eq!(relevancy.grade, Grade::NeedsImprovement);

        let correctness = system
            .metrics
            .iter()
            .find(|m| m.metric == "correctness")
            .unwrap();
        assert_eq!(correctness.grade, Grade::Unscored);
        assert_eq!(system.overall, Some(0.75));
        assert!(summary.to_string().contains("academic.relevancy: 0.750"));
    }
}
