// crates/server/src/lib.rs
//! Storybook server library.
//!
//! Axum HTTP server that turns a short description into an illustrated
//! children's book. Jobs run in the background; clients follow them through
//! an SSE stream and fetch the finished book by task id.

pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ConfigError, JobSettings};
pub use error::*;
pub use routes::app_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use storybook_core::llm::{create_moderator, create_provider};
use storybook_core::{create_image_generator, ImageGenerator, LlmProvider, ModerationProvider};
use tower_http::trace::TraceLayer;

use crate::jobs::Collaborators;

/// Create the Axum application with all routes and middleware.
pub fn create_app(state: Arc<AppState>) -> Router {
    app_routes(state).layer(TraceLayer::new_for_http())
}

/// Build the external collaborators selected by `config`.
///
/// Fails when the selected backends are missing credentials or endpoints.
pub fn build_collaborators(config: &AppConfig) -> Result<Collaborators, ConfigError> {
    let llm = create_provider(&config.llm)?;
    let moderator = create_moderator(&config.llm)?;
    let images = create_image_generator(&config.images)?;

    tracing::info!(
        llm = llm.name(),
        model = llm.model(),
        moderation = moderator.name(),
        images = images.name(),
        "collaborators configured"
    );

    Ok(Collaborators {
        moderator,
        llm,
        images,
    })
}

// ============================================================================
// Integration Tests
// ============================================================================
