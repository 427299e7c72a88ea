// crates/core/src/illustration/mod.rs
//! Image-generation collaborators.
//!
//! An `ImageGenerator` turns one text prompt into one illustration
//! reference: either a URL the client can fetch or an inline `data:` URI.

pub mod openai;
pub mod stability;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiImages;
pub use stability::StabilityImages;

/// Errors from an image-generation backend.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Image API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Image API returned no image")]
    NoImage,

    #[error("Image backend not available: {0}")]
    NotAvailable(String),
}

/// Trait for text-to-image backends.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image for `prompt` and return a reference to it.
    async fn generate(&self, prompt: &str) -> Result<String, ImageError>;

    /// Backend name for logging/display.
    fn name(&self) -> &str;
}

/// Supported image backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBackend {
    OpenAi,
    Stability,
}

impl std::str::FromStr for ImageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "dalle" => Ok(Self::OpenAi),
            "stability" | "stabilityai" => Ok(Self::Stability),
            other => Err(format!("unknown image provider: {other}")),
        }
    }
}

/// Configuration for an image backend instance.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub backend: ImageBackend,
    pub api_key: Option<String>,
    /// Base URL override.
    pub endpoint: Option<String>,
    /// Stability engine id; ignored by the OpenAI backend.
    pub engine_id: String,
    pub size: u32,
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            backend: ImageBackend::Stability,
            api_key: None,
            endpoint: None,
            engine_id: "stable-diffusion-xl-1024-v1-0".into(),
            size: 1024,
            timeout_secs: 120,
        }
    }
}

/// Create the image backend described by `config`.
pub fn create_image_generator(config: &ImageConfig) -> Result<Arc<dyn ImageGenerator>, ImageError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| ImageError::NotAvailable(format!("no API key for {:?}", config.backend)))?;

    let generator: Arc<dyn ImageGenerator> = match config.backend {
        ImageBackend::OpenAi => Arc::new(OpenAiImages::new(config, api_key)?),
        ImageBackend::Stability => Arc::new(StabilityImages::new(config, api_key)?),
    };
    Ok(generator)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ImageError> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

pub(crate) async fn api_error(resp: reqwest::Response) -> ImageError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ImageError::Api {
        status,
        body: body.chars().take(500).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("openai".parse::<ImageBackend>(), Ok(ImageBackend::OpenAi));
        assert_eq!("StabilityAI".parse::<ImageBackend>(), Ok(ImageBackend::Stability));
        assert!("midjourney".parse::<ImageBackend>().is_err());
    }

    #[test]
    fn test_factory_requires_key() {
        let err = create_image_generator(&ImageConfig::default())
            .err()
            .expect("missing key must fail");
        assert!(matches!(err, ImageError::NotAvailable(_)));
    }

    #[test]
    fn test_factory_builds_selected_backend() {
        let config = ImageConfig {
            backend: ImageBackend::OpenAi,
            api_key: Some("sk-test".into()),
            ..ImageConfig::default()
        };
        assert_eq!(create_image_generator(&config).unwrap().name(), "openai-images");

        let config = ImageConfig {
            api_key: Some("sk-test".into()),
            ..ImageConfig::default()
        };
        assert_eq!(create_image_generator(&config).unwrap().name(), "stability");
    }
}
