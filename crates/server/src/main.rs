// crates/server/src/main.rs
//! Storybook server binary.
//!
//! Reads configuration from the environment (and `.env`), builds the
//! collaborators, then serves HTTP until Ctrl-C.

use anyhow::{Context, Result};
use storybook_server::{build_collaborators, create_app, metrics::init_metrics, AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,storybook_server=info,storybook_core=info".into()),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let collaborators = build_collaborators(&config).context("cannot build collaborators")?;
    init_metrics();

    let addr = config.addr();
    let state = AppState::new(collaborators, config.jobs.clone());
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        retention_secs = config.jobs.retention.as_secs(),
        max_pages = config.jobs.max_pages,
        "storybook server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("storybook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("received Ctrl-C, starting graceful shutdown");
}
