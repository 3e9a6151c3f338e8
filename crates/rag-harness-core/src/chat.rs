//! Chat model trait.
//!
//! Concrete models (OpenAI-compatible, Ollama) live in the app crate.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation backend that answers a single prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;

    /// Send `prompt` as a user message and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
