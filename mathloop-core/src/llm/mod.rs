//! The inference seam.
//!
//! The engine talks to a [`TextGenerator`]; in production that is the
//! [`CompletionClient`](client::CompletionClient) hitting an
//! OpenAI-compatible server, in tests it is the replayable
//! [`MockGenerator`](crate::mock::MockGenerator).

pub mod client;

use crate::error::GenerateError;
use std::future::Future;

/// A single completion request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully formatted prompt text.
    pub prompt: String,
    /// Cap on newly generated tokens for this request.
    pub max_new_tokens: u32,
}

impl GenerationRequest {
    /// Create a request for a prompt with a token cap.
    pub fn new(prompt: impl Into<String>, max_new_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_new_tokens,
        }
    }
}

/// Trait for text-generation backends.
///
/// Implementations own their transport and sampling parameters; the
/// request carries only the prompt and the per-call token cap.
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the request.
    ///
    /// Returns the generated text. Whether the prompt is echoed back at
    /// the front of the completion is backend-dependent; callers that
    /// need only the continuation should strip the prompt prefix.
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerateError>> + Send;
}
