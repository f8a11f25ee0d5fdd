use thiserror::Error;
use uuid::Uuid;

pub type IntakeResult<T> = Result<T, IntakeError>;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Duplicate PAN fingerprint; rejected synchronously.
    #[error("an application with this PAN already exists")]
    DuplicatePan,

    #[error("application not found: {0}")]
    NotFound(Uuid),

    #[error("encryption error: {0}")]
    Crypto(#[from] pan_crypto::CryptoError),

    #[error("database error: {0}")]
    Store(loan_store::StoreError),
}

impl From<loan_store::StoreError> for IntakeError {
    fn from(err: loan_store::StoreError) -> Self {
        match err {
            // The unique index on pan_number_hash is the authoritative
            // duplicate guard; a race past the pre-check lands here
            loan_store::StoreError::DuplicatePan { .. } => IntakeError::DuplicatePan,
            loan_store::StoreError::ApplicationNotFound(id) => IntakeError::NotFound(id),
            other => IntakeError::Store(other),
        }
    }
}
