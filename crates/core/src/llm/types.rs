// crates/core/src/llm/types.rs
//! Request/response/error types for the text and moderation collaborators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request for a general-purpose LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    /// Provider default when `None`.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn text(user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            user_prompt: user_prompt.into(),
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a general-purpose LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub latency_ms: u64,
}

/// Outcome of a moderation check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerdict {
    pub flagged: bool,
    /// Names of the categories that triggered the flag.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl ModerationVerdict {
    pub fn allowed() -> Self {
        Self::default()
    }

    pub fn rejected(categories: Vec<String>) -> Self {
        Self {
            flagged: true,
            categories,
        }
    }

    pub fn passed(&self) -> bool {
        !self.flagged
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseFailed(String),

    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider returned an empty completion")]
    EmptyResponse,

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}
