// crates/core/src/illustration/stability.rs
//! Stability text-to-image backend.
//!
//! Stability answers with raw PNG bytes; they are handed back inline as a
//! base64 `data:image/png` URI so no separate object store is needed.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

use super::{api_error, http_client, ImageConfig, ImageError, ImageGenerator};

const DEFAULT_API_HOST: &str = "https://api.stability.ai";

/// Client for `POST /v1/generation/{engine}/text-to-image`.
pub struct StabilityImages {
    client: reqwest::Client,
    api_host: String,
    api_key: String,
    engine_id: String,
    size: u32,
}

impl StabilityImages {
    pub fn new(config: &ImageConfig, api_key: String) -> Result<Self, ImageError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_host: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_API_HOST.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            engine_id: config.engine_id.clone(),
            size: config.size,
        })
    }
}

#[async_trait]
impl ImageGenerator for StabilityImages {
    async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let body = serde_json::json!({
            "text_prompts": [{ "text": prompt }],
            "cfg_scale": 7,
            "height": self.size,
            "width": self.size,
            "samples": 1,
            "steps": 30,
            "style_preset": "comic-book",
        });

        let resp = self
            .client
            .post(format!(
                "{}/v1/generation/{}/text-to-image",
                self.api_host, self.engine_id
            ))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "image/png")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ImageError::NoImage);
        }
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(&bytes)))
    }

    fn name(&self) -> &str {
        "stability"
    }
}
