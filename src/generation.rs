//! Generation model trait for producing answers from prompts.

use async_trait::async_trait;

use crate::error::Result;

/// A generative language model behind a unified async interface.
///
/// Implementations wrap chat/completion backends. Failures surface as
/// [`RagError::GenerationError`](crate::RagError::GenerationError) carrying
/// the provider name, never as a panic.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for the given prompt, returning plain text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// A short name identifying the backing provider/model.
    fn name(&self) -> &str;
}
