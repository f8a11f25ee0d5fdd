//! Reference DDL for the shared store.
//!
//! Production schema management is owned by an external migration
//! pipeline; this module documents the persisted layout the store code is
//! written against and lets integration tests bootstrap a scratch
//! database. `audit_log.application_id` carries no foreign key so
//! permanent-failure entries can reference aggregates that were never
//! persisted.

use sqlx::PgPool;

use crate::StoreResult;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS applications (
        application_id UUID PRIMARY KEY,
        pan_number_encrypted BYTEA NOT NULL,
        pan_number_hash CHAR(64) NOT NULL,
        first_name VARCHAR(100) NOT NULL,
        last_name VARCHAR(100) NOT NULL,
        date_of_birth DATE NOT NULL,
        email VARCHAR(255) NOT NULL,
        phone_number VARCHAR(15) NOT NULL,
        requested_amount NUMERIC(10, 2) NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
        credit_score INT,
        annual_income NUMERIC(12, 2),
        existing_loans_count INT,
        decision_reason TEXT,
        max_approved_amount NUMERIC(10, 2),
        version INT NOT NULL DEFAULT 1,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_pan_hash ON applications (pan_number_hash)",
    "CREATE INDEX IF NOT EXISTS idx_applications_status ON applications (status)",
    r#"
    CREATE TABLE IF NOT EXISTS outbox_events (
        id BIGSERIAL PRIMARY KEY,
        aggregate_id UUID NOT NULL,
        event_type VARCHAR(100) NOT NULL,
        payload JSONB NOT NULL,
        topic_name VARCHAR(100) NOT NULL,
        partition_key VARCHAR(255) NOT NULL,
        published BOOLEAN NOT NULL DEFAULT FALSE,
        published_at TIMESTAMPTZ,
        error_message TEXT,
        retry_count INT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_outbox_events_published ON outbox_events (published, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_outbox_events_aggregate_id ON outbox_events (aggregate_id)",
    r#"
    CREATE TABLE IF NOT EXISTS processed_messages (
        id BIGSERIAL PRIMARY KEY,
        message_id VARCHAR(255) NOT NULL,
        topic_name VARCHAR(100) NOT NULL,
        partition_num INT,
        offset_num BIGINT,
        consumer_group VARCHAR(100) NOT NULL,
        processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_processed_messages_message_id ON processed_messages (message_id)",
    r#"
    CREATE TABLE IF NOT EXISTS audit_log (
        id BIGSERIAL PRIMARY KEY,
        application_id UUID NOT NULL,
        service_name VARCHAR(50) NOT NULL,
        operation VARCHAR(50) NOT NULL,
        user_id VARCHAR(100),
        accessed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_audit_log_application_id ON audit_log (application_id)",
];

/// Create the store tables if they do not exist.
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
