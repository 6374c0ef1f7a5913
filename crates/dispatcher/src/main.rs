//! Inferoute Dispatcher - Main Entry Point
//!
//! Loads the static backend set, then serves the job entry point,
//! routing each inbound job to the least-loaded healthy backend.

use anyhow::Context;
use inferoute_common::NodeConfig;
use inferoute_dispatcher::{build_router, AppState, Balancer, BackendRegistry, HealthProber};
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
                .unwrap_or_else(|_| "inferoute_dispatcher=info,tower_http=info,axum=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Inferoute Dispatcher");

    // Load configuration
    let config_path = std::env::var("INFEROUTE_CONFIG")
        .unwrap_or_else(|_| "configs/dispatcher.yaml".to_string());

    let config = NodeConfig::from_file(&config_path)?;
    if config.mode != "dispatcher" {
        anyhow::bail!("Config mode is {:?}, expected \"dispatcher\"", config.mode);
    }

    info!(
        "Dispatcher configuration loaded: bind={}:{}",
        config.bind_address, config.port
    );

    let dispatcher_config = config
        .dispatcher
        .as_ref()
        .context("Dispatcher config not found")?;

    // Build the registry from the static backend set
    let registry = Arc::new(BackendRegistry::new(&dispatcher_config.backends));
    for backend in &dispatcher_config.backends {
        info!("Registered backend: {} at {}", backend.id, backend.url);
    }

    let prober = HealthProber::new(
        Duration::from_secs(dispatcher_config.grace_period_secs),
        Duration::from_secs(dispatcher_config.probe_timeout_secs),
    );
    let balancer = Arc::new(Balancer::new(prober));

    let state = AppState::new(
        registry,
        balancer,
        Duration::from_secs(dispatcher_config.forward_timeout_secs),
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    info!("Inferoute Dispatcher listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Inferoute Dispatcher shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Received shutdown signal");
}
