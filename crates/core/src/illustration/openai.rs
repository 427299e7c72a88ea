// crates/core/src/illustration/openai.rs
//! OpenAI images backend. Returns the hosted image URL.

use async_trait::async_trait;
use serde::Deserialize;

use super::{api_error, http_client, ImageConfig, ImageError, ImageGenerator};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for `POST /v1/images/generations`.
///
/// OpenAI-hosted URLs expire after about an hour, which matches the default
/// job retention.
pub struct OpenAiImages {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    size: u32,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

impl OpenAiImages {
    pub fn new(config: &ImageConfig, api_key: String) -> Result<Self, ImageError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            size: config.size,
        })
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let body = serde_json::json!({
            "prompt": prompt,
            "n": 1,
            "size": format!("{0}x{0}", self.size),
        });

        let resp = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let parsed: ImagesResponse = resp.json().await?;
        parsed
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or(ImageError::NoImage)
    }

    fn name(&self) -> &str {
        "openai-images"
    }
}
