//! Pipeline configuration.
//!
//! One immutable [`PipelineConfig`] is resolved at process start (defaults,
//! then environment overrides) and passed by reference to whatever needs
//! it. Nothing in the library reads the environment on its own.

use crate::error::LoadError;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default student model identifier.
pub const DEFAULT_BASE_MODEL: &str = "microsoft/Phi-3-mini-4k-instruct";

/// Default inference endpoint (OpenAI-compatible local server).
pub const DEFAULT_API_BASE: &str = "http://localhost:8000/v1";

/// Top-level configuration for the pipeline.
///
/// Every field has a default and an environment override. Construct once
/// with [`PipelineConfig::from_env`] (or `Default` in tests) and share by
/// reference; the struct is never mutated after construction.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct PipelineConfig {
    /// Base model identifier, override with `BASE_MODEL`.
    pub base_model: String,

    /// OpenAI-compatible inference endpoint, override with `API_BASE`.
    pub api_base: String,

    /// API key for the inference endpoint, override with `API_KEY`.
    ///
    /// Optional: local servers usually accept unauthenticated requests.
    /// Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum prompt length in characters, override with `MAX_PROMPT_CHARS`.
    ///
    /// Prompts longer than this are truncated before generation.
    pub max_prompt_chars: usize,

    /// LoRA fine-tuning hyperparameters (configuration surface for the
    /// training stage; evaluation does not consume these).
    pub lora: LoraParams,

    /// Problems sampled into the evaluation subset, override with
    /// `NUM_EVAL_SAMPLES`.
    pub num_eval_samples: usize,

    /// Problems sampled for a training round, override with
    /// `NUM_TRAIN_SAMPLES`.
    pub num_train_samples: usize,

    /// Root for datasets (`raw/`, `iterations/`, `processed/`), override
    /// with `DATA_DIR`.
    pub data_dir: PathBuf,

    /// Root for model artifacts (`adapters/`), override with `MODEL_DIR`.
    pub models_dir: PathBuf,

    /// Root for run outputs (`logs/`, `metrics/`), override with
    /// `OUTPUT_DIR`.
    pub output_dir: PathBuf,
}

/// LoRA hyperparameters.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct LoraParams {
    /// Rank of the low-rank decomposition, override with `LORA_R`.
    pub rank: u32,
    /// Scaling factor, override with `LORA_ALPHA`.
    pub alpha: u32,
    /// Dropout applied to LoRA layers, override with `LORA_DROPOUT`.
    pub dropout: f64,
    /// Learning rate, override with `LEARNING_RATE`.
    pub learning_rate: f64,
    /// Per-device batch size, override with `BATCH_SIZE`.
    pub batch_size: u32,
    /// Gradient accumulation steps, override with `GRADIENT_ACCUMULATION_STEPS`.
    pub gradient_accumulation_steps: u32,
    /// Number of fine-tuning epochs, override with `NUM_EPOCHS`.
    pub num_epochs: u32,
}

impl Default for LoraParams {
    fn default() -> Self {
        Self {
            rank: 16,
            alpha: 32,
            dropout: 0.05,
            learning_rate: 2e-4,
            batch_size: 4,
            gradient_accumulation_steps: 4,
            num_epochs: 3,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_model: DEFAULT_BASE_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            max_prompt_chars: 8192,
            lora: LoraParams::default(),
            num_eval_samples: 200,
            num_train_samples: 150,
            data_dir: PathBuf::from("data"),
            models_dir: PathBuf::from("models"),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl PipelineConfig {
    /// Resolve the configuration from the process environment.
    ///
    /// Unset variables fall back to defaults; set-but-unparseable numeric
    /// variables are a hard configuration error rather than a silent
    /// default.
    pub fn from_env() -> Result<Self, LoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration from an arbitrary key lookup.
    ///
    /// This is the testable core of [`from_env`](Self::from_env): tests
    /// inject a closure instead of mutating process-global state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lora_defaults = LoraParams::default();

        Ok(Self {
            base_model: lookup("BASE_MODEL").unwrap_or(defaults.base_model),
            api_base: lookup("API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            api_key: lookup("API_KEY").filter(|s| !s.is_empty()),
            max_prompt_chars: parse(&lookup, "MAX_PROMPT_CHARS", defaults.max_prompt_chars)?,
            lora: LoraParams {
                rank: parse(&lookup, "LORA_R", lora_defaults.rank)?,
                alpha: parse(&lookup, "LORA_ALPHA", lora_defaults.alpha)?,
                dropout: parse(&lookup, "LORA_DROPOUT", lora_defaults.dropout)?,
                learning_rate: parse(&lookup, "LEARNING_RATE", lora_defaults.learning_rate)?,
                batch_size: parse(&lookup, "BATCH_SIZE", lora_defaults.batch_size)?,
                gradient_accumulation_steps: parse(
                    &lookup,
                    "GRADIENT_ACCUMULATION_STEPS",
                    lora_defaults.gradient_accumulation_steps,
                )?,
                num_epochs: parse(&lookup, "NUM_EPOCHS", lora_defaults.num_epochs)?,
            },
            num_eval_samples: parse(&lookup, "NUM_EVAL_SAMPLES", defaults.num_eval_samples)?,
            num_train_samples: parse(&lookup, "NUM_TRAIN_SAMPLES", defaults.num_train_samples)?,
            data_dir: lookup("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            models_dir: lookup("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }

    /// Raw downloaded datasets.
    pub fn raw_data_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Per-iteration evaluation outputs (`iter_0`, `iter_1`, ...).
    pub fn iterations_dir(&self) -> PathBuf {
        self.data_dir.join("iterations")
    }

    /// Processed training data.
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    /// Fine-tuned adapter directories.
    pub fn adapters_dir(&self) -> PathBuf {
        self.models_dir.join("adapters")
    }

    /// Run logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.output_dir.join("logs")
    }

    /// Aggregated metrics.
    pub fn metrics_dir(&self) -> PathBuf {
        self.output_dir.join("metrics")
    }

    /// Create the full directory layout if it does not exist yet.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.raw_data_dir(),
            self.iterations_dir(),
            self.processed_dir(),
            self.adapters_dir(),
            self.logs_dir(),
            self.metrics_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, LoadError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LoadError::Config(format!("{key}={raw:?} is not a valid value"))),
        None => Ok(default),
    }
}

/// Sampling and request parameters for the completion client.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct GenerationConfig {
    /// Sampling temperature.
    ///
    /// Default: 0.7
    pub temperature: f32,

    /// Nucleus sampling cutoff.
    ///
    /// Default: 0.9
    pub top_p: f32,

    /// Default cap on newly generated tokens per request.
    ///
    /// Default: 512
    pub max_new_tokens: u32,

    /// Timeout for an individual completion request.
    ///
    /// Default: 120 seconds
    pub timeout: Duration,

    /// Additional attempts after the initial try, for transient failures.
    ///
    /// Default: 2
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds).
    ///
    /// Default: 1000ms
    pub retry_base_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_new_tokens: 512,
            timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

impl GenerationConfig {
    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the nucleus sampling cutoff.
    #[must_use]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Set the default cap on newly generated tokens.
    #[must_use]
    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries on transient failures.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for exponential backoff (milliseconds).
    #[must_use]
    pub fn with_retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = delay_ms;
        self
    }

    /// Retry delay for a given attempt number (0-indexed).
    ///
    /// Exponential backoff, capped at 60 seconds.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        const MAX_DELAY_MS: u64 = 60_000;

        let delay_ms = self
            .retry_base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(MAX_DELAY_MS);

        Duration::from_millis(delay_ms)
    }
}
