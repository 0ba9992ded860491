//! Evaluation result and metrics types.
//!
//! Output types for evaluation runs, designed for JSON serialization and
//! programmatic consumption.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dataset::Problem;
use crate::extract::answers_match;

/// Result of evaluating a single problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Problem identifier
    pub id: String,

    /// The question that was asked
    pub question: String,

    /// Gold answer extracted from the reference solution
    pub gold_answer: String,

    /// Full model output (step-by-step reasoning)
    pub reasoning: String,

    /// Answer extracted from the model output (empty if none found)
    pub pred_answer: String,

    /// Whether the predicted answer matched the gold answer
    pub correct: bool,

    /// Error message if generation failed for this problem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationResult {
    /// Create a scored result from a completed generation.
    pub fn scored(
        problem: &Problem,
        gold_answer: String,
        reasoning: String,
        pred_answer: String,
    ) -> Self {
        let correct = answers_match(&pred_answer, &gold_answer);
        Self {
            id: problem.id.clone(),
            question: problem.question.clone(),
            gold_answer,
            reasoning,
            pred_answer,
            correct,
            error: None,
        }
    }

    /// Create a result for a problem whose generation failed.
    ///
    /// Failed problems count toward the total but never toward correct.
    pub fn failed(problem: &Problem, gold_answer: String, error: String) -> Self {
        Self {
            id: problem.id.clone(),
            question: problem.question.clone(),
            gold_answer,
            reasoning: String::new(),
            pred_answer: String::new(),
            correct: false,
            error: Some(error),
        }
    }
}

/// Aggregate metrics for an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Name of the evaluated split or iteration
    pub split: String,

    /// Total number of problems evaluated
    pub total: usize,

    /// Number of correct answers
    pub correct: usize,

    /// Accuracy as a percentage (0-100), rounded to two decimals
    pub accuracy: f64,

    /// Adapter path, or `"base_model"` when evaluating without one
    pub adapter: String,
}

impl Metrics {
    /// Compute metrics over a slice of results.
    ///
    /// An empty slice yields 0.0 accuracy rather than NaN.
    pub fn from_results(split: &str, adapter: &str, results: &[EvaluationResult]) -> Self {
        let total = results.len();
        let correct = results.iter().filter(|r| r.correct).count();
        let accuracy = if total > 0 {
            round2(correct as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        Self {
            split: split.to_string(),
            total,
            correct,
            accuracy,
            adapter: adapter.to_string(),
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_problem() -> Problem {
        Problem {
            id: "gsm8k_0".to_string(),
            question: "What is 2+2?".to_string(),
            answer: "2+2=4\n#### 4".to_string(),
        }
    }

    #[test]
    fn test_scored_correct() {
        let problem = sample_problem();
        let result = EvaluationResult::scored(
            &problem,
            "4".to_string(),
            "2 plus 2 is 4.\n#### 4".to_string(),
            "4".to_string(),
        );

        assert!(result.correct);
        assert!(result.error.is_none());
        assert_eq!(result.id, "gsm8k_0");
    }

    #[test]
    fn test_scored_incorrect() {
        let problem = sample_problem();
        let result = EvaluationResult::scored(
            &problem,
            "4".to_string(),
            "#### 5".to_string(),
            "5".to_string(),
        );

        assert!(!result.correct);
    }

    #[test]
    fn test_scored_empty_prediction_never_correct() {
        let problem = sample_problem();
        let result = EvaluationResult::scored(
            &problem,
            "0".to_string(),
            "I could not solve this.".to_string(),
            String::new(),
        );

        assert!(!result.correct);
    }

    #[test]
    fn test_failed_result() {
        let problem = sample_problem();
        let result = EvaluationResult::failed(&problem, "4".to_string(), "Timeout".to_string());

        assert!(!result.correct);
        assert_eq!(result.error, Some("Timeout".to_string()));
        assert!(result.pred_answer.is_empty());
        assert!(result.reasoning.is_empty());
    }

    #[test]
    fn test_error_field_omitted_when_none() {
        let problem = sample_problem();
        let result = EvaluationResult::scored(
            &problem,
            "4".to_string(),
            "#### 4".to_string(),
            "4".to_string(),
        );

        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("\"error\""));

        let failed = EvaluationResult::failed(&problem, "4".to_string(), "boom".to_string());
        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("\"error\":\"boom\""));
    }

    #[test]
    fn test_metrics_from_results() {
        let problem = sample_problem();
        let results = vec![
            EvaluationResult::scored(&problem, "4".into(), "#### 4".into(), "4".into()),
            EvaluationResult::scored(&problem, "4".into(), "#### 5".into(), "5".into()),
            EvaluationResult::scored(&problem, "4".into(), "#### 9".into(), "9".into()),
        ];

        let metrics = Metrics::from_results("eval", "base_model", &results);
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.correct, 1);
        assert_eq!(metrics.accuracy, 33.33);
        assert_eq!(metrics.adapter, "base_model");
        assert_eq!(metrics.split, "eval");
    }

    #[test]
    fn test_metrics_empty_results() {
        let metrics = Metrics::from_results("eval", "base_model", &[]);
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.correct, 0);
        assert_eq!(metrics.accuracy, 0.0);
    }

    #[test]
    fn test_metrics_all_correct() {
        let problem = sample_problem();
        let results = vec![EvaluationResult::scored(
            &problem,
            "4".into(),
            "#### 4".into(),
            "4".into(),
        )];

        let metrics = Metrics::from_results("eval", "models/adapters/iter_1", &results);
        assert_eq!(metrics.accuracy, 100.0);
        assert_eq!(metrics.adapter, "models/adapters/iter_1");
    }

    #[test]
    fn test_save_json_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("metrics.json");

        let metrics = Metrics::from_results("eval", "base_model", &[]);
        save_json(&path, &metrics).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Metrics = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.split, "eval");
        // Pretty-printed output has two-space indentation.
        assert!(content.contains("\n  \"split\""));
    }
}
