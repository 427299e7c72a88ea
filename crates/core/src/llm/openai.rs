// crates/core/src/llm/openai.rs
//! OpenAI-compatible provider — chat completions and moderation over HTTP.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use super::config::LlmConfig;
use super::provider::{LlmProvider, ModerationProvider};
use super::types::{CompletionRequest, CompletionResponse, LlmError, ModerationVerdict};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for the OpenAI `/v1/chat/completions` and `/v1/moderations` APIs.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: std::collections::BTreeMap<String, bool>,
}

impl OpenAiClient {
    /// Create a client from configuration. The key is sent as a bearer token when present.
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::NotAvailable(format!("failed to build HTTP client: {e}")))?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, LlmError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "openai: non-success response");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| LlmError::ParseFailed(e.to_string()))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let t0 = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.user_prompt }));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        let resp: ChatResponse = self.post_json("/v1/chat/completions", &body).await?;
        let latency_ms = t0.elapsed().as_millis() as u64;

        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        tracing::debug!(model = %self.model, latency_ms, "openai: completion finished");

        Ok(CompletionResponse {
            content,
            model: resp.model,
            input_tokens: resp.usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens: resp.usage.as_ref().map(|u| u.completion_tokens),
            latency_ms,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModerationProvider for OpenAiClient {
    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, LlmError> {
        let body = serde_json::json!({ "input": text });
        let resp: ModerationResponse = self.post_json("/v1/moderations", &body).await?;

        let result = resp
            .results
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseFailed("moderation response had no results".into()))?;

        if !result.flagged {
            return Ok(ModerationVerdict::allowed());
        }
        let categories = result
            .categories
            .into_iter()
            .filter_map(|(name, hit)| hit.then_some(name))
            .collect();
        Ok(ModerationVerdict::rejected(categories))
    }

    fn name(&self) -> &str {
        "openai-moderation"
    }
}
