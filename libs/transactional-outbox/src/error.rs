//! Error types for the outbox publisher.

use thiserror::Error;

/// Result type alias for outbox operations.
pub type OutboxResult<T> = Result<T, OutboxError>;

#[derive(Error, Debug)]
pub enum OutboxError {
    /// Store access failed (selection, mark-published, mark-failed)
    #[error("store error: {0}")]
    Store(#[from] loan_store::StoreError),

    /// Failed to deliver an event to the broker
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// Producer construction or configuration failed
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Payload serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
