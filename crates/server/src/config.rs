// crates/server/src/config.rs
//! Server configuration, read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::{NonZeroU32, NonZeroU64};
use std::str::FromStr;
use std::time::Duration;

use storybook_core::{ImageBackend, ImageConfig, ImageError, LlmConfig, LlmError, ProviderType};
use thiserror::Error;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("text collaborator unavailable: {0}")]
    Llm(#[from] LlmError),

    #[error("image collaborator unavailable: {0}")]
    Image(#[from] ImageError),
}

/// Tunables of the job subsystem.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// How long a finished job stays retrievable.
    pub retention: Duration,
    /// Keep-alive interval of the update stream.
    pub poll_interval: Duration,
    /// Upper bound for `pgs`.
    pub max_pages: u32,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(3600),
            poll_interval: crate::jobs::DEFAULT_POLL_INTERVAL,
            max_pages: 12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub llm: LlmConfig,
    pub images: ImageConfig,
    pub jobs: JobSettings,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match (get("STORYBOOK_PORT"), get("PORT")) {
            (Some(raw), _) => parse_value("STORYBOOK_PORT", &raw)?,
            (None, Some(raw)) => parse_value("PORT", &raw)?,
            (None, None) => DEFAULT_PORT,
        };
        let host = parse_or(&get, "STORYBOOK_HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;

        let openai_key = get("OPENAI_API_KEY");
        let openai_base = get("OPENAI_BASE_URL");
        let llm = LlmConfig {
            provider: match (&openai_key, &openai_base) {
                (None, Some(_)) => ProviderType::OpenAiCompatible,
                _ => ProviderType::OpenAi,
            },
            model: get("STORYBOOK_TEXT_MODEL").unwrap_or_else(|| LlmConfig::default().model),
            api_key: openai_key.clone(),
            endpoint: openai_base,
            temperature: parse_or(&get, "STORYBOOK_TEMPERATURE", LlmConfig::default().temperature)?,
            timeout_secs: parse_or(&get, "STORYBOOK_LLM_TIMEOUT_SECS", LlmConfig::default().timeout_secs)?,
        };

        let defaults = ImageConfig::default();
        let backend: ImageBackend = match get("STORYBOOK_IMAGE_PROVIDER") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "STORYBOOK_IMAGE_PROVIDER",
                value: raw.clone(),
                reason,
            })?,
            None => defaults.backend,
        };
        let images = match backend {
            ImageBackend::OpenAi => ImageConfig {
                backend,
                api_key: openai_key,
                endpoint: get("OPENAI_BASE_URL"),
                size: parse_or(&get, "STORYBOOK_IMAGE_SIZE", 512)?,
                ..defaults
            },
            ImageBackend::Stability => ImageConfig {
                backend,
                api_key: get("STABILITYAI_API_KEY"),
                endpoint: get("STABILITY_API_HOST"),
                engine_id: get("STABILITY_ENGINE_ID").unwrap_or_else(|| defaults.engine_id.clone()),
                size: parse_or(&get, "STORYBOOK_IMAGE_SIZE", defaults.size)?,
                ..defaults
            },
        };

        let job_defaults = JobSettings::default();
        // Zero would make streams spin, reap jobs at once, or refuse every book.
        let jobs = JobSettings {
            retention: match get("STORYBOOK_RETENTION_SECS") {
                Some(raw) => Duration::from_secs(
                    parse_value::<NonZeroU64>("STORYBOOK_RETENTION_SECS", &raw)?.get(),
                ),
                None => job_defaults.retention,
            },
            poll_interval: match get("STORYBOOK_POLL_INTERVAL_MS") {
                Some(raw) => Duration::from_millis(
                    parse_value::<NonZeroU64>("STORYBOOK_POLL_INTERVAL_MS", &raw)?.get(),
                ),
                None => job_defaults.poll_interval,
            },
            max_pages: match get("STORYBOOK_MAX_PAGES") {
                Some(raw) => parse_value::<NonZeroU32>("STORYBOOK_MAX_PAGES", &raw)?.get(),
                None => job_defaults.max_pages,
            },
        };

        Ok(Self {
            host,
            port,
            llm,
            images,
            jobs,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
