//! Completion provider trait for answer generation

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt-in, text-out completion
///
/// Retry policy, if any, lives in the implementation; callers treat an error
/// as final.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
