//! Inferoute Edge - Main Entry Point
//!
//! Serves the user-facing form and the cluster-health dashboard,
//! forwarding questions to the dispatcher.

use anyhow::Context;
use inferoute_common::NodeConfig;
use inferoute_edge::{build_router, AppState};
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inferoute_edge=info,tower_http=info,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Inferoute Edge");

    // Load configuration
    let config_path =
        std::env::var("INFEROUTE_CONFIG").unwrap_or_else(|_| "configs/edge.yaml".to_string());

    let config = NodeConfig::from_file(&config_path)?;
    if config.mode != "edge" {
        anyhow::bail!("Config mode is {:?}, expected \"edge\"", config.mode);
    }

    let edge_config = config.edge.as_ref().context("Edge config not found")?;

    info!(
        "Edge configuration loaded: bind={}:{}, dispatcher={}",
        config.bind_address, config.port, edge_config.dispatcher_url
    );

    let state = AppState::new(
        edge_config.dispatcher_url.clone(),
        Duration::from_secs(edge_config.request_timeout_secs),
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    info!("Inferoute Edge listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Inferoute Edge shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Received shutdown signal");
}
