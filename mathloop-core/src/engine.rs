//! Reasoning engine: formats the prompt, calls the backend, returns the
//! continuation.

use crate::error::{GenerateError, LoadError};
use crate::llm::{GenerationRequest, TextGenerator};
use crate::prompts;
use std::path::{Path, PathBuf};

/// Default cap on newly generated tokens per reasoning call.
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 512;

/// Default cap on prompt length, in characters.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 8192;

/// A validated reference to a fine-tuned adapter.
///
/// The adapter lives in a directory on disk and is served by the inference
/// server under a model id derived from that directory's name. Validation
/// happens at construction; an `AdapterRef` in hand is known to point at
/// an existing directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRef {
    path: PathBuf,
    model_id: String,
}

impl AdapterRef {
    /// Validate an adapter directory and derive its served model id.
    ///
    /// Fails with [`LoadError::AdapterNotFound`] if the path does not
    /// exist or is not a directory.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(LoadError::AdapterNotFound(path));
        }
        let model_id = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("adapter")
            .to_string();
        Ok(Self { path, model_id })
    }

    /// The adapter directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The model id the inference server serves this adapter under.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Generates step-by-step reasoning for math questions.
///
/// Exclusively owns its backend for its lifetime; backend resources
/// (connection pool or device memory, depending on the implementation)
/// are released when the engine is dropped. Swapping adapters means
/// constructing a new engine — there is no in-place hot-swap.
#[derive(Debug)]
pub struct ReasoningEngine<G> {
    generator: G,
    adapter: Option<AdapterRef>,
    max_prompt_chars: usize,
}

impl<G: TextGenerator> ReasoningEngine<G> {
    /// Create an engine over a backend, optionally with an adapter.
    ///
    /// The adapter reference must already be validated (see
    /// [`AdapterRef::from_path`]); `None` means unmodified base-model
    /// behavior.
    pub fn new(generator: G, adapter: Option<AdapterRef>) -> Self {
        Self {
            generator,
            adapter,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }

    /// Create an engine with an adapter loaded from a directory path.
    pub fn with_adapter_path(generator: G, path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let adapter = AdapterRef::from_path(path)?;
        Ok(Self::new(generator, Some(adapter)))
    }

    /// Set the prompt truncation limit (characters).
    #[must_use]
    pub fn with_max_prompt_chars(mut self, max_prompt_chars: usize) -> Self {
        self.max_prompt_chars = max_prompt_chars.max(1);
        self
    }

    /// The adapter this engine runs with, if any.
    pub fn adapter(&self) -> Option<&AdapterRef> {
        self.adapter.as_ref()
    }

    /// Label for metrics: the adapter path, or `"base_model"`.
    pub fn adapter_label(&self) -> String {
        match &self.adapter {
            Some(adapter) => adapter.path().display().to_string(),
            None => "base_model".to_string(),
        }
    }

    /// Generate step-by-step reasoning for a question.
    ///
    /// Formats the fixed reasoning prompt, truncates it to the configured
    /// length, and runs sampling generation bounded by `max_new_tokens`.
    /// Returns only the newly generated continuation: backends that echo
    /// the prompt have the prefix stripped, and the result is trimmed.
    pub async fn generate_reasoning(
        &self,
        question: &str,
        max_new_tokens: u32,
    ) -> Result<String, GenerateError> {
        let prompt = truncate_chars(
            prompts::format_reasoning_prompt(question),
            self.max_prompt_chars,
        );

        let raw = self
            .generator
            .generate(GenerationRequest::new(prompt.clone(), max_new_tokens))
            .await?;

        let continuation = raw.strip_prefix(prompt.as_str()).unwrap_or(&raw);
        Ok(continuation.trim().to_string())
    }
}

/// Truncate a string to at most `max_chars` characters, on a char boundary.
fn truncate_chars(mut s: String, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            s.truncate(byte_index);
            s
        }
        None => s,
    }
}
