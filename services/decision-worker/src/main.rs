//! Decision worker entry point.

use anyhow::{Context, Result};
use decision_worker::config::Settings;
use decision_worker::DecisionHandler;
use idempotent_consumer::IdempotentConsumer;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "decision_worker=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting decision worker");

    let settings = Settings::load().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("Database pool initialized");

    let handler = DecisionHandler::new(settings.max_update_retries);
    let consumer = Arc::new(
        IdempotentConsumer::new(&settings.consumer_config(), pool, handler)
            .context("Failed to create Kafka consumer")?,
    );

    info!(
        input_topic = %settings.input_topic,
        group = %settings.consumer_group_id,
        max_update_retries = settings.max_update_retries,
        "Decision worker ready"
    );

    let loop_handle = {
        let consumer = consumer.clone();
        tokio::spawn(async move { consumer.run().await })
    };

    shutdown_signal().await;
    info!("Shutdown signal received");

    consumer.stop();
    loop_handle.await.context("Consumer task failed")?;

    info!("Decision worker shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
