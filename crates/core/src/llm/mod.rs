// crates/core/src/llm/mod.rs
//! Text-generation and moderation collaborators.
//!
//! Provides the `LlmProvider` and `ModerationProvider` traits plus an
//! OpenAI-compatible HTTP implementation of both.

pub mod config;
pub mod factory;
pub mod openai;
pub mod provider;
pub mod types;

pub use config::{LlmConfig, ProviderType};
pub use factory::{create_moderator, create_provider};
pub use openai::OpenAiClient;
pub use provider::{LlmProvider, ModerationProvider};
pub use types::{CompletionRequest, CompletionResponse, LlmError, ModerationVerdict};
