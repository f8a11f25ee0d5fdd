//! Configuration for the intake writer and its outbox processor.
//!
//! Settings come from environment variables; a `.env` file is honored in
//! debug builds. The process exits non-zero when a required value is
//! missing or malformed.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub encryption_key: String,
    pub kafka: KafkaSettings,
    pub outbox: OutboxSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            encryption_key: env::var("ENCRYPTION_KEY").context("ENCRYPTION_KEY must be set")?,
            kafka: KafkaSettings::from_env()?,
            outbox: OutboxSettings::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct KafkaSettings {
    pub bootstrap_servers: String,
}

impl KafkaSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            bootstrap_servers: env::var("KAFKA_BOOTSTRAP_SERVERS")
                .context("KAFKA_BOOTSTRAP_SERVERS must be set")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct OutboxSettings {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_retries: i32,
}

impl OutboxSettings {
    fn from_env() -> Result<Self> {
        let poll_interval_ms: u64 = env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("Invalid POLL_INTERVAL_MS")?;

        Ok(Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            batch_size: env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid BATCH_SIZE")?,
            max_retries: env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid MAX_RETRIES")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_settings_defaults_and_overrides() {
        env::remove_var("POLL_INTERVAL_MS");
        env::remove_var("BATCH_SIZE");
        env::remove_var("MAX_RETRIES");

        let settings = OutboxSettings::from_env().unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(100));
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.max_retries, 5);

        env::set_var("POLL_INTERVAL_MS", "250");
        env::set_var("BATCH_SIZE", "50");
        env::set_var("MAX_RETRIES", "8");

        let settings = OutboxSettings::from_env().unwrap();
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.max_retries, 8);

        env::remove_var("POLL_INTERVAL_MS");
        env::remove_var("BATCH_SIZE");
        env::remove_var("MAX_RETRIES");
    }
}
