// Main entry point - sandbox dashboard record server for builder sessions
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use dashboard_builder::infrastructure::config::{load_builder_config, load_catalog};
use dashboard_builder::presentation::{app_state::AppState, router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dashboard_builder=info,tower_http=info")),
        )
        .init();

    let config = load_builder_config()?;

    // The catalog is only checked here; builder sessions load it themselves
    match load_catalog("config/catalog.toml") {
        Ok(catalog) => tracing::info!(items = catalog.items.len(), "widget catalog is valid"),
        Err(e) => tracing::warn!(error = %e, "widget catalog not loaded"),
    }

    let state = Arc::new(AppState::in_memory());
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!(%addr, "starting dashboard sandbox");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
