//! Scoring worker entry point.

use anyhow::{Context, Result};
use idempotent_consumer::IdempotentConsumer;
use scoring_worker::config::Settings;
use scoring_worker::ScoringHandler;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "scoring_worker=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting scoring worker");

    let settings = Settings::load().context("Failed to load configuration")?;

    let key = pan_crypto::EncryptionKey::from_base64(&settings.encryption_key)
        .context("ENCRYPTION_KEY must be base64 of exactly 32 bytes")?;
    let cipher = Arc::new(pan_crypto::PanCipher::new(&key));

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!("Database pool initialized");

    let handler = ScoringHandler::new(cipher, settings.output_topic.clone());
    let consumer = Arc::new(
        IdempotentConsumer::new(&settings.consumer_config(), pool, handler)
            .context("Failed to create Kafka consumer")?,
    );

    info!(
        input_topic = %settings.input_topic,
        output_topic = %settings.output_topic,
        group = %settings.consumer_group_id,
        "Scoring worker ready"
    );

    let loop_handle = {
        let consumer = consumer.clone();
        tokio::spawn(async move { consumer.run().await })
    };

    shutdown_signal().await;
    info!("Shutdown signal received");

    consumer.stop();
    loop_handle.await.context("Consumer task failed")?;

    info!("Scoring worker shutdown complete");
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
