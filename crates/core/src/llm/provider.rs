// crates/core/src/llm/provider.rs
//! Traits for the text-generation and moderation collaborators.

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse, LlmError, ModerationVerdict};

/// Trait for LLM providers that generate text from a prompt.
///
/// Implementations include:
/// - `OpenAiClient` — OpenAI-compatible chat completions API
/// - test doubles in the server crate
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a completion with optional system prompt + user prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Provider name for logging/display (e.g. "openai").
    fn name(&self) -> &str;

    /// Model identifier (e.g. "gpt-4").
    fn model(&self) -> &str;
}

/// Trait for content-moderation services.
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Check free text. An `Ok` verdict may still reject the content.
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, LlmError>;

    fn name(&self) -> &str;
}
