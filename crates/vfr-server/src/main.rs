//! VFR route planner HTTP server.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vfr_server::catalog_loader::load_catalog;
use vfr_server::config::Config;
use vfr_server::state::AppState;
use vfr_server::api;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("vfr_server=debug".parse()?))
        .init();

    tracing::info!("Starting VFR route planner...");

    let config = Config::from_env();
    let port = config.server_port;

    let catalog_config = config.clone();
    let catalog = tokio::task::spawn_blocking(move || load_catalog(&catalog_config))
        .await
        .context("catalog loader panicked")?
        .with_context(|| format!("loading catalog from {}", config.airports_csv.display()))?;

    if !config.elevation_enabled() {
        tracing::warn!("VFR_ELEVATION_URL is empty; terrain is treated as sea level");
    }
    let state = Arc::new(AppState::new(catalog, config));

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
