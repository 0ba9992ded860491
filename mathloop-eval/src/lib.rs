//! # Mathloop Eval
//!
//! Evaluation framework for math word-problem reasoning.
//!
//! ## Overview
//!
//! `mathloop-eval` measures how well a reasoning backend solves GSM8K-style
//! problems:
//!
//! - **Datasets**: Download/cache GSM8K, draw reproducible subsets, and
//!   read/write the JSON problem files the pipeline exchanges
//! - **Extraction**: Dig the final numeric answer out of free-form model
//!   output, with strict normalized matching against the gold answer
//! - **Evaluator**: Sequential batch execution with progress callbacks and
//!   per-problem fault isolation
//! - **Results**: Structured `predictions.json` / `metrics.json` output
//!
//! ## Architecture
//!
//! ```text
//! mathloop-core (engine, backends, prompts)
//!     ↓
//! mathloop-eval (datasets, extraction, evaluator)  ← this crate
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use mathloop_core::{CompletionClient, GenerationConfig, ReasoningEngine};
//! use mathloop_eval::Evaluator;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Connect to an OpenAI-compatible inference server
//! let client = CompletionClient::connect(
//!     "http://localhost:8000/v1",
//!     None,
//!     "microsoft/Phi-3-mini-4k-instruct",
//!     GenerationConfig::default(),
//! )
//! .await?;
//!
//! // Run evaluation over a prepared problem file
//! let evaluator = Evaluator::new(ReasoningEngine::new(client, None));
//! let metrics = evaluator
//!     .evaluate(
//!         Path::new("data/raw/gsm8k_subset.json"),
//!         Path::new("outputs/metrics/eval"),
//!         "eval",
//!     )
//!     .await?;
//!
//! println!("{}/{} correct ({:.2}%)", metrics.correct, metrics.total, metrics.accuracy);
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod evaluator;
pub mod extract;
pub mod results;

pub use dataset::{load_problems, prepare_subset, save_problems, DatasetError, Gsm8k, Gsm8kSplit, Problem};
pub use evaluator::{EvalError, EvalProgress, Evaluator};
pub use extract::{answers_match, extract_answer, normalize_answer};
pub use results::{save_json, EvaluationResult, Metrics};
