//! Text generation model trait.

use async_trait::async_trait;

use crate::error::Result;

/// A generative model that completes a prompt with text.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model or provider name used in logs.
    fn name(&self) -> &str;
}
