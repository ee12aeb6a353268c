//! Storage Advisor - periodic storage cost analysis service
//!
//! Analyzes the configured inventory on a fixed interval and serves the
//! latest recommendations, health and Prometheus metrics over HTTP.

use advisor_lib::{AdvisorMetrics, StructuredLogger};
use anyhow::Result;
use std::sync::Arc;
use storage_advisor::{api, config::AdvisorConfig, runner::AnalysisRunner, state::ReportStore};
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ADVISOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting storage-advisor");

    let config = AdvisorConfig::load()?;
    let context = Arc::new(config.engine_context()?);
    info!(
        instance = %config.instance,
        window_days = context.config.window_days,
        threshold_pct = context.config.utilization_threshold_percent,
        "Advisor configured"
    );

    let logger = StructuredLogger::new(config.instance.clone());
    logger.log_startup(ADVISOR_VERSION);

    let store = ReportStore::new();
    let app_state = Arc::new(api::AppState::new(store.clone(), AdvisorMetrics::new()));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let api_port = config.api_port;

    let runner = AnalysisRunner::new(config, context, store);
    let runner_handle = tokio::spawn(runner.run(shutdown_rx));

    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, app_state).await {
            error!(error = %e, "API server stopped");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    let _ = runner_handle.await;
    api_handle.abort();
    info!("Shutting down");

    Ok(())
}
