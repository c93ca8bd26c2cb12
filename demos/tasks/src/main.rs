//! Task list HTTP server.
//!
//! Run with: `cargo run -p tasks`
//!
//! Environment:
//! - `TASKS_ADDR` - listen address (default `127.0.0.1:3000`)
//! - `COURIER_DUPLICATE_HANDLERS`, `COURIER_LOG_PAYLOADS`, `COURIER_SLOW_REQUEST_MS`
//! - `RUST_LOG` - tracing filter

use anyhow::Context;
use courier_runtime::metrics::install_prometheus;
use courier_runtime::{Mediator, MediatorConfig, MetricsBehavior};
use tasks::{AppState, TaskStore, TasksModule, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,courier_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = MediatorConfig::from_env().context("invalid mediator configuration")?;
    let metrics = install_prometheus().context("failed to install metrics recorder")?;

    let store = TaskStore::new();
    let mediator = Mediator::builder()
        .with_config(config)
        .logging()
        .behavior(MetricsBehavior)
        .module(TasksModule::new(store).with_validation())
        .build()?;

    let addr = std::env::var("TASKS_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Task list listening");

    axum::serve(listener, router(AppState::new(mediator).with_metrics(metrics)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Task list stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}
