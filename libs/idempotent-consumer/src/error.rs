//! Error taxonomy for the idempotent consumer protocol.
//!
//! The framework decides commit-vs-replay from the error class, so
//! handlers never re-raise for control flow:
//! - [`HandlerError::Transient`] rolls back and replays (offset untouched)
//! - [`HandlerError::Validation`] rolls back, routes to the DLQ, advances
//! - [`HandlerError::Permanent`] rolls back, audits, routes to the DLQ,
//!   advances

use loan_store::StoreError;
use thiserror::Error;

/// Result type alias for framework operations.
pub type ConsumerResult<T> = Result<T, ConsumerError>;

/// Failures of the framework itself (not of business logic).
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Typed failure surfaced by worker business logic.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Malformed or business-invalid payload; no retry would help.
    #[error("validation failure: {0}")]
    Validation(String),

    /// Permanent business failure (missing aggregate row, fingerprint
    /// mismatch); advanced with an audit entry.
    #[error("permanent failure: {0}")]
    Permanent(String),

    /// Infrastructure failure; the message is replayed.
    #[error("transient failure: {0}")]
    Transient(#[source] anyhow::Error),
}

impl HandlerError {
    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        HandlerError::Transient(err.into())
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        match err {
            // A missing aggregate can never be repaired by redelivery
            StoreError::ApplicationNotFound(id) => {
                HandlerError::Permanent(format!("application not found: {id}"))
            }
            StoreError::InvalidStatus(e) => {
                HandlerError::Permanent(format!("stored status is invalid: {e}"))
            }
            StoreError::Serialization(e) => {
                HandlerError::Permanent(format!("payload serialization failed: {e}"))
            }
            // Integrity violations (SQLSTATE class 23) cannot succeed on
            // redelivery; everything else database-shaped can
            StoreError::Database(e) if is_integrity_violation(&e) => {
                HandlerError::Permanent(format!("constraint violation: {e}"))
            }
            // Lock exhaustion, duplicate races, and connection trouble all
            // resolve through redelivery
            err @ (StoreError::RetryExhausted { .. }
            | StoreError::DuplicateMessage { .. }
            | StoreError::DuplicatePan { .. }
            | StoreError::Database(_)) => HandlerError::Transient(err.into()),
        }
    }
}

fn is_integrity_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code.starts_with("23"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_store_error_classification() {
        let not_found: HandlerError = StoreError::ApplicationNotFound(Uuid::new_v4()).into();
        assert!(matches!(not_found, HandlerError::Permanent(_)));

        let exhausted: HandlerError = StoreError::RetryExhausted {
            application_id: Uuid::new_v4(),
            attempts: 3,
        }
        .into();
        assert!(matches!(exhausted, HandlerError::Transient(_)));

        let duplicate: HandlerError = StoreError::DuplicateMessage {
            message_id: "x:y:0:1".into(),
        }
        .into();
        assert!(matches!(duplicate, HandlerError::Transient(_)));
    }
}
