//! # airc-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment:
//! `PORT` (default 8080), `AUTH_TOKEN`, `AIRC_LEDGER_DIR`,
//! `AIRC_REVIEWERS_FILE`, plus the engine's `AIRC_*` tunables.

use airc_api::state::{AppConfig, AppState};
use airc_engine::EngineConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid server configuration: {e}");
        e
    })?;
    let engine_config = EngineConfig::from_env().map_err(|e| {
        tracing::error!("Invalid engine configuration: {e}");
        e
    })?;
    tracing::info!(?config, ?engine_config, "configuration loaded");

    let port = config.port;
    let state = AppState::from_config(config, engine_config).map_err(|e| {
        tracing::error!("Startup failed: {e}");
        e
    })?;

    let app = airc_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("AIRC API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
