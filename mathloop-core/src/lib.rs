//! # mathloop-core
//!
//! Core building blocks for the mathloop pipeline: an iterative
//! self-distillation loop that improves a language model's math
//! word-problem solving.
//!
//! This crate holds everything below the evaluation harness:
//!
//! - **Config**: one immutable [`PipelineConfig`] resolved at startup
//! - **Prompts**: the fixed reasoning / correction / extraction templates
//! - **Inference**: the [`TextGenerator`] seam, with an OpenAI-compatible
//!   [`CompletionClient`] for production and a [`mock::MockGenerator`]
//!   for offline tests
//! - **Engine**: the [`ReasoningEngine`] that turns a question into
//!   step-by-step reasoning text
//!
//! ## Architecture
//!
//! ```text
//! mathloop-core (config, prompts, engine, inference client)
//!     ↓
//! mathloop-eval (extraction, datasets, evaluator, CLI)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use mathloop_core::{
//!     CompletionClient, GenerationConfig, PipelineConfig, ReasoningEngine,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::from_env()?;
//!
//! // Connect to the inference server; fails if the model is not served.
//! let client = CompletionClient::connect(
//!     &config.api_base,
//!     config.api_key.as_deref(),
//!     &config.base_model,
//!     GenerationConfig::default(),
//! )
//! .await?;
//!
//! // No adapter: unmodified base-model behavior.
//! let engine = ReasoningEngine::new(client, None);
//! let reasoning = engine
//!     .generate_reasoning("Janet has 16 eggs...", 512)
//!     .await?;
//! println!("{reasoning}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod mock;
pub mod prompts;

// Re-export public API
pub use config::{GenerationConfig, LoraParams, PipelineConfig};
pub use engine::{AdapterRef, ReasoningEngine, DEFAULT_MAX_NEW_TOKENS, DEFAULT_MAX_PROMPT_CHARS};
pub use error::{GenerateError, LoadError};
pub use llm::client::CompletionClient;
pub use llm::{GenerationRequest, TextGenerator};
