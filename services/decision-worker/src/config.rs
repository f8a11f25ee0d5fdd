//! Configuration for the decision worker.

use anyhow::{Context, Result};
use event_schema::topics;
use idempotent_consumer::ConsumerConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub kafka_bootstrap_servers: String,
    pub consumer_group_id: String,
    pub input_topic: String,
    pub dlq_topic: String,
    pub session_timeout_ms: u64,
    pub max_poll_interval_ms: u64,
    pub max_update_retries: u32,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        let input_topic = env::var("INPUT_TOPIC")
            .unwrap_or_else(|_| topics::CREDIT_REPORTS_GENERATED.to_string());
        let dlq_topic =
            env::var("DLQ_TOPIC").unwrap_or_else(|_| topics::dlq_topic(&input_topic));

        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            kafka_bootstrap_servers: env::var("KAFKA_BOOTSTRAP_SERVERS")
                .context("KAFKA_BOOTSTRAP_SERVERS must be set")?,
            consumer_group_id: env::var("CONSUMER_GROUP_ID")
                .unwrap_or_else(|_| "decision-worker-group".to_string()),
            input_topic,
            dlq_topic,
            session_timeout_ms: env::var("SESSION_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .context("Invalid SESSION_TIMEOUT_MS")?,
            max_poll_interval_ms: env::var("MAX_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "300000".to_string())
                .parse()
                .context("Invalid MAX_POLL_INTERVAL_MS")?,
            max_update_retries: env::var("MAX_UPDATE_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid MAX_UPDATE_RETRIES")?,
        })
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            bootstrap_servers: self.kafka_bootstrap_servers.clone(),
            group_id: self.consumer_group_id.clone(),
            input_topic: self.input_topic.clone(),
            dlq_topic: self.dlq_topic.clone(),
            session_timeout_ms: self.session_timeout_ms,
            max_poll_interval_ms: self.max_poll_interval_ms,
        }
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
