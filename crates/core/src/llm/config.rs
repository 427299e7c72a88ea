// crates/core/src/llm/config.rs
//! LLM provider configuration types.

/// Configuration for an LLM provider instance.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderType,
    pub model: String,
    pub api_key: Option<String>,
    /// Base URL override, e.g. `http://localhost:11434` for a local server.
    pub endpoint: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Supported LLM provider types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderType {
    /// api.openai.com, requires an API key.
    OpenAi,
    /// Any server speaking the OpenAI wire format, requires an endpoint.
    OpenAiCompatible,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::OpenAi,
            model: "gpt-4".into(),
            api_key: None,
            endpoint: None,
            temperature: 0.7,
            timeout_secs: 240,
        }
    }
}
