//! Intake writer entry point: hosts the singleton outbox processor.

use anyhow::{Context, Result};
use intake_writer::config::Settings;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use transactional_outbox::{KafkaOutboxPublisher, OutboxProcessor, OutboxProcessorConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "intake_writer=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting intake writer");

    let settings = Settings::load().context("Failed to load configuration")?;

    // The submission path builds its cipher from the same key; parsing
    // here fails fast on bad configuration
    pan_crypto::EncryptionKey::from_base64(&settings.encryption_key)
        .context("ENCRYPTION_KEY must be base64 of exactly 32 bytes")?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!(
        max_connections = settings.database.max_connections,
        "Database pool initialized"
    );

    let publisher = Arc::new(
        KafkaOutboxPublisher::new(&settings.kafka.bootstrap_servers)
            .context("Failed to create Kafka producer")?,
    );

    let processor = Arc::new(OutboxProcessor::new(
        pool,
        publisher,
        OutboxProcessorConfig {
            poll_interval: settings.outbox.poll_interval,
            batch_size: settings.outbox.batch_size,
            max_retries: settings.outbox.max_retries,
        },
    ));

    let loop_handle = {
        let processor = processor.clone();
        tokio::spawn(async move { processor.run().await })
    };

    shutdown_signal().await;
    info!("Shutdown signal received");

    processor.stop();
    loop_handle.await.context("Outbox processor task failed")?;

    info!("Intake writer shutdown complete");
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
