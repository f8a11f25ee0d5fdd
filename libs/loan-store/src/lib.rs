//! Typed data-access layer for the loan prequalification store.
//!
//! One module per table: applications (with the optimistic-locking update
//! protocol), the transactional outbox, the processed-message ledger, and
//! the PAN-access audit trail. All writes that must be atomic with other
//! writes take an open [`sqlx::Transaction`]; reads take any executor.

pub mod applications;
pub mod audit;
pub mod model;
pub mod outbox;
pub mod processed;
pub mod schema;

mod error;

pub use error::StoreError;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
