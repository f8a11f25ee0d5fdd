//! Row types for the store.

use chrono::{DateTime, NaiveDate, Utc};
use event_schema::{ApplicationStatus, DomainEvent};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A committed `applications` row.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRecord {
    pub application_id: Uuid,
    pub pan_number_encrypted: Vec<u8>,
    pub pan_number_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone_number: String,
    pub requested_amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub credit_score: Option<i32>,
    pub annual_income: Option<Decimal>,
    pub existing_loans_count: Option<i32>,
    pub decision_reason: Option<String>,
    pub max_approved_amount: Option<Decimal>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new application; status starts PENDING at version 1.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub application_id: Uuid,
    pub pan_number_encrypted: Vec<u8>,
    pub pan_number_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone_number: String,
    pub requested_amount: Decimal,
    pub annual_income: Decimal,
    pub existing_loans_count: Option<i32>,
}

/// The decision worker's terminal mutation of an application.
#[derive(Debug, Clone)]
pub struct DecisionUpdate {
    pub status: ApplicationStatus,
    pub credit_score: i32,
    pub decision_reason: String,
    pub max_approved_amount: Option<Decimal>,
}

/// Result of applying a decision through the optimistic-locking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionApplied {
    /// The row moved from PENDING to the terminal state; version bumped.
    Updated { new_version: i32 },
    /// A concurrent writer already rendered a terminal state; nothing was
    /// written (terminal states are never revised).
    AlreadyDecided,
}

/// A pending `outbox_events` row.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxEventRow {
    pub id: i64,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub topic_name: String,
    pub partition_key: String,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
}

/// An outbox row to insert alongside the domain write that produced it.
#[derive(Debug, Clone)]
pub struct NewOutboxEvent {
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub topic_name: String,
    pub partition_key: String,
}

impl NewOutboxEvent {
    /// Build an outbox row from a typed domain event.
    pub fn from_event<E: DomainEvent>(event: &E) -> Result<Self, serde_json::Error> {
        Ok(Self {
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_value(event)?,
            topic_name: event.topic().to_string(),
            partition_key: event.partition_key(),
        })
    }
}

/// An idempotency-ledger entry keyed by the composite message fingerprint.
#[derive(Debug, Clone)]
pub struct NewProcessedMessage {
    pub message_id: String,
    pub topic_name: String,
    pub partition_num: i32,
    pub offset_num: i64,
    pub consumer_group: String,
}
