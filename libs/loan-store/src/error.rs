use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the data-access layer.
///
/// Unique-constraint races are mapped to their domain meaning
/// (`DuplicatePan`, `DuplicateMessage`) so callers never have to inspect
/// database error codes themselves.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("an application with this PAN already exists")]
    DuplicatePan { pan_hash: String },

    #[error("message already recorded as processed: {message_id}")]
    DuplicateMessage { message_id: String },

    #[error("application not found: {0}")]
    ApplicationNotFound(Uuid),

    #[error("optimistic lock retries exhausted for application {application_id} after {attempts} attempts")]
    RetryExhausted {
        application_id: Uuid,
        attempts: u32,
    },

    #[error("stored status is invalid: {0}")]
    InvalidStatus(#[from] event_schema::UnknownStatus),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the underlying failure is a PostgreSQL unique violation
    /// (error code 23505).
    pub(crate) fn unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db| db.code())
            .as_deref()
            == Some("23505")
    }
}
