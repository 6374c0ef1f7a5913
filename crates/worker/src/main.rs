//! Inferoute Worker - Main Entry Point
//!
//! Serves inference jobs forwarded by the dispatcher, executing each one
//! against the configured compute endpoint and self-reporting load.

use anyhow::Context;
use inferoute_common::NodeConfig;
use inferoute_worker::{build_router, AppState, ComputeClient, LoadReporter, LoadTracker};
use std::sync::Arc;
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
                .unwrap_or_else(|_| "inferoute_worker=info,tower_http=info,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Inferoute Worker");

    // Load configuration
    let config_path =
        std::env::var("INFEROUTE_CONFIG").unwrap_or_else(|_| "configs/worker.yaml".to_string());

    let config = NodeConfig::from_file(&config_path)?;
    if config.mode != "worker" {
        anyhow::bail!("Config mode is {:?}, expected \"worker\"", config.mode);
    }

    let worker_config = config.worker.as_ref().context("Worker config not found")?;

    info!(
        "Worker configuration loaded: id={}, bind={}:{}, dispatcher={}",
        worker_config.worker_id, config.bind_address, config.port, worker_config.dispatcher_url
    );

    let reporter = Arc::new(LoadReporter::new(
        worker_config.dispatcher_url.clone(),
        worker_config.worker_id.clone(),
        Duration::from_secs(worker_config.report_timeout_secs),
    ));
    let tracker = Arc::new(LoadTracker::new(reporter));
    let compute = Arc::new(ComputeClient::new(&worker_config.compute));

    let state = AppState { tracker, compute };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    info!("Inferoute Worker listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Inferoute Worker shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Received shutdown signal");
}
