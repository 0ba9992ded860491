//! Mock generator for offline testing.
//!
//! Replays a scripted sequence of completions, enabling evaluator and
//! engine tests with no inference server and no network. Each call to
//! [`TextGenerator::generate`] consumes the next scripted reply.
//!
//! # Example
//!
//! ```
//! use mathloop_core::mock::MockGenerator;
//! use mathloop_core::{GenerationRequest, TextGenerator};
//!
//! # async fn example() {
//! let mock = MockGenerator::from_texts(["Step 1: 2+2=4\n#### 4"]);
//! let text = mock.generate(GenerationRequest::new("prompt", 512)).await.unwrap();
//! assert!(text.contains("#### 4"));
//! # }
//! ```

use crate::error::GenerateError;
use crate::llm::{GenerationRequest, TextGenerator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with `GenerateError::Other` carrying this message.
    Failure(String),
}

/// A [`TextGenerator`] that replays scripted replies in order.
#[derive(Debug)]
pub struct MockGenerator {
    replies: Vec<MockReply>,
    next: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Create a mock from a reply script.
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            next: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that returns each text in turn.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|t| MockReply::Text(t.into()))
                .collect(),
        )
    }

    /// Number of scripted replies.
    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }

    /// Number of replies consumed so far.
    pub fn consumed(&self) -> usize {
        self.next.load(Ordering::SeqCst).min(self.replies.len())
    }

    /// Whether every scripted reply has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.next.load(Ordering::SeqCst) >= self.replies.len()
    }

    /// Prompts received so far, in call order.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl TextGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerateError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let index = self.next.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(index) {
            Some(MockReply::Text(text)) => Ok(text.clone()),
            Some(MockReply::Failure(message)) => Err(GenerateError::Other(message.clone())),
            None => Err(GenerateError::Other(format!(
                "Mock generator exhausted after {} replies",
                self.replies.len()
            ))),
        }
    }
}
