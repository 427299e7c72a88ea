// crates/core/src/llm/factory.rs
//! Provider factory — creates collaborators from configuration.

use std::sync::Arc;

use super::config::{LlmConfig, ProviderType};
use super::openai::OpenAiClient;
use super::provider::{LlmProvider, ModerationProvider};
use super::types::LlmError;

fn build_client(config: &LlmConfig) -> Result<OpenAiClient, LlmError> {
    match config.provider {
        ProviderType::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::NotAvailable("OPENAI_API_KEY is not set".into()))?;
            OpenAiClient::new(config, Some(api_key))
        }
        ProviderType::OpenAiCompatible => {
            if config.endpoint.is_none() {
                return Err(LlmError::NotAvailable(
                    "an OpenAI-compatible provider needs an endpoint".into(),
                ));
            }
            OpenAiClient::new(config, config.api_key.clone())
        }
    }
}

/// Create the text-generation provider described by `config`.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    Ok(Arc::new(build_client(config)?))
}

/// Create the moderation provider described by `config`.
pub fn create_moderator(config: &LlmConfig) -> Result<Arc<dyn ModerationProvider>, LlmError> {
    Ok(Arc::new(build_client(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_key() {
        let config = LlmConfig::default();
        let err = create_provider(&config).err().expect("missing key must fail");
        assert!(matches!(err, LlmError::NotAvailable(_)));
    }

    #[test]
    fn test_compatible_requires_endpoint() {
        let config = LlmConfig {
            provider: ProviderType::OpenAiCompatible,
            ..LlmConfig::default()
        };
        assert!(create_moderator(&config).is_err());

        let config = LlmConfig {
            provider: ProviderType::OpenAiCompatible,
            endpoint: Some("http://localhost:8000".into()),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).expect("endpoint is enough");
        assert_eq!(provider.model(), "gpt-4");
    }
}
