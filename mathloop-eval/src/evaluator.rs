//! Batch evaluation over a problem set.
//!
//! The [`Evaluator`] drives a [`ReasoningEngine`] over a set of problems
//! one at a time, in dataset order, scores each prediction against the
//! extracted gold answer, and persists per-problem predictions plus
//! aggregate metrics as JSON.
//!
//! Problems are processed sequentially rather than concurrently: results
//! stay in dataset order, and a local inference server under evaluation is
//! not hammered with parallel requests.

use std::path::Path;
use thiserror::Error;

use mathloop_core::{ReasoningEngine, TextGenerator, DEFAULT_MAX_NEW_TOKENS};

use crate::dataset::{load_problems, DatasetError, Problem};
use crate::extract::extract_answer;
use crate::results::{save_json, EvaluationResult, Metrics};

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// Failed to load the problem set
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Failed to write predictions or metrics
    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),
}

/// Progress events emitted during evaluation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum EvalProgress {
    /// Problem set loaded, evaluation starting.
    Started {
        /// Total number of problems to evaluate.
        total: usize,
    },
    /// A problem was evaluated (scored or failed).
    ProblemCompleted {
        /// Number of problems completed so far.
        completed: usize,
        /// Total number of problems.
        total: usize,
        /// Whether the prediction matched the gold answer.
        correct: bool,
    },
}

/// Evaluates a reasoning engine against a problem set.
///
/// # Example
///
/// ```no_run
/// use mathloop_core::{CompletionClient, GenerationConfig, ReasoningEngine};
/// use mathloop_eval::Evaluator;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = CompletionClient::connect(
///     "http://localhost:8000/v1",
///     None,
///     "microsoft/Phi-3-mini-4k-instruct",
///     GenerationConfig::default(),
/// )
/// .await?;
/// let engine = ReasoningEngine::new(client, None);
///
/// let evaluator = Evaluator::new(engine);
/// let metrics = evaluator
///     .evaluate(
///         Path::new("data/raw/gsm8k_subset.json"),
///         Path::new("outputs/metrics/eval"),
///         "eval",
///     )
///     .await?;
/// println!("Accuracy: {:.2}%", metrics.accuracy);
/// # Ok(())
/// # }
/// ```
pub struct Evaluator<G: TextGenerator> {
    engine: ReasoningEngine<G>,
    max_new_tokens: u32,
    sample_limit: Option<usize>,
}

impl<G: TextGenerator> Evaluator<G> {
    /// Create an evaluator around a reasoning engine.
    pub fn new(engine: ReasoningEngine<G>) -> Self {
        Self {
            engine,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            sample_limit: None,
        }
    }

    /// Set the per-problem generation budget.
    #[must_use]
    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Evaluate only the first `n` problems of the set.
    #[must_use]
    pub fn with_sample_limit(mut self, n: usize) -> Self {
        self.sample_limit = Some(n);
        self
    }

    /// Run the full evaluation, writing `predictions.json` and
    /// `metrics.json` under `output_dir`.
    pub async fn evaluate(
        &self,
        data_path: &Path,
        output_dir: &Path,
        split_name: &str,
    ) -> Result<Metrics, EvalError> {
        self.evaluate_with_progress(data_path, output_dir, split_name, |_| {})
            .await
    }

    /// Same as [`evaluate`](Self::evaluate), but calls the provided
    /// callback with progress events as problems complete.
    ///
    /// A generation failure on one problem does not abort the run: the
    /// problem is recorded as incorrect with its error message, and the
    /// loop continues.
    pub async fn evaluate_with_progress<F>(
        &self,
        data_path: &Path,
        output_dir: &Path,
        split_name: &str,
        on_progress: F,
    ) -> Result<Metrics, EvalError>
    where
        F: Fn(EvalProgress),
    {
        let mut problems = load_problems(data_path).await?;
        if let Some(limit) = self.sample_limit {
            problems.truncate(limit);
        }
        let total = problems.len();

        log::info!(
            "Evaluating {} problems from {:?} ({})",
            total,
            data_path,
            self.engine.adapter_label()
        );
        on_progress(EvalProgress::Started { total });

        let mut results = Vec::with_capacity(total);
        for (completed, problem) in problems.iter().enumerate() {
            let result = self.evaluate_problem(problem).await;
            on_progress(EvalProgress::ProblemCompleted {
                completed: completed + 1,
                total,
                correct: result.correct,
            });
            results.push(result);
        }

        let metrics = Metrics::from_results(split_name, &self.engine.adapter_label(), &results);

        save_json(&output_dir.join("predictions.json"), &results)?;
        save_json(&output_dir.join("metrics.json"), &metrics)?;

        log::info!(
            "Evaluation complete: {}/{} correct ({:.2}%), results in {:?}",
            metrics.correct,
            metrics.total,
            metrics.accuracy,
            output_dir
        );

        Ok(metrics)
    }

    /// Evaluate one problem, isolating generation failures.
    async fn evaluate_problem(&self, problem: &Problem) -> EvaluationResult {
        let gold = extract_answer(&problem.answer);

        match self
            .engine
            .generate_reasoning(&problem.question, self.max_new_tokens)
            .await
        {
            Ok(reasoning) => {
                let pred = extract_answer(&reasoning);
                EvaluationResult::scored(problem, gold, reasoning, pred)
            }
            Err(e) => {
                log::warn!("Problem {} failed: {}", problem.id, e);
                EvaluationResult::failed(problem, gold, e.to_string())
            }
        }
    }
}
