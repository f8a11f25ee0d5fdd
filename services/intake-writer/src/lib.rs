//! Intake writer for the loan prequalification pipeline.
//!
//! Accepts loan applications and persists them with the transactional
//! outbox pattern: the application row, the PAN-access audit entry, and
//! the `APPLICATION_SUBMITTED` outbox row commit in a single database
//! transaction. The intake writer emits no bus traffic itself; the
//! co-located outbox processor drains the table to Kafka.
//!
//! The HTTP surface in front of [`service::ApplicationService`] is an
//! external collaborator; this crate is its programmatic interface.

pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod validators;

pub use error::{IntakeError, IntakeResult};
pub use service::ApplicationService;
