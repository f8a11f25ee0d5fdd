//! Idempotent Kafka consumer protocol for the loan prequalification
//! pipeline.
//!
//! Every worker that reads the bus implements [`EventHandler`] and runs
//! inside an [`IdempotentConsumer`]. The framework guarantees that for
//! each bus message the worker either
//! (a) commits all side-effects and the idempotency record atomically and
//! then advances its bus position, or
//! (b) commits nothing and the message is replayed.
//!
//! ## Per-message algorithm
//!
//! 1. Deserialize the typed payload once at the edge (malformed payloads
//!    are dead-lettered and advanced; no retry would help).
//! 2. Build the message fingerprint
//!    `aggregate_id:topic:partition:offset`, stable across redeliveries.
//! 3. Open a database transaction and check the `processed_messages`
//!    ledger; a duplicate commits nothing and advances.
//! 4. Invoke the handler inside the transaction: business side-effects,
//!    any outbound outbox rows, then the ledger insert, all co-commit.
//! 5. Advance the bus position only after the commit succeeds. Any
//!    failure before commit rolls back and leaves the offset untouched.
//!
//! The `processed_messages` table is the only source of truth for
//! "already processed"; no in-memory state survives a restart, so the
//! guarantee holds across crashes and rebalances.
//!
//! ## Ordering and cancellation
//!
//! Within a partition processing is strictly sequential; the bus position
//! advances per-partition. On shutdown the in-flight message finishes
//! (commit or rollback) before the poll loop exits.

use async_trait::async_trait;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::ClientConfig;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use event_schema::DomainEvent;
use loan_store::audit::{self, AuditOperation};
use loan_store::model::NewProcessedMessage;
use loan_store::processed;

mod dlq;
mod error;

pub use dlq::{DlqSink, KafkaDlqSink};
pub use error::{ConsumerError, ConsumerResult, HandlerError};

/// Bus polls are bounded so the running flag is observed at least once a
/// second.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Composite idempotency key: `aggregate_id:topic:partition:offset`.
pub fn message_fingerprint(aggregate_id: Uuid, topic: &str, partition: i32, offset: i64) -> String {
    format!("{aggregate_id}:{topic}:{partition}:{offset}")
}

/// Worker-specific business logic, invoked inside the message
/// transaction.
///
/// Handlers write side-effects and outbox rows through `tx` and surface
/// failures as typed [`HandlerError`]s; the framework owns the ledger
/// insert, the commit, and the advance decision.
#[async_trait]
pub trait EventHandler: Send + Sync {
    type Event: DomainEvent;

    async fn handle(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: Self::Event,
    ) -> Result<(), HandlerError>;
}

/// What to do with the bus position after a processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Commit the offset; the message is done (processed, duplicate, or
    /// dead-lettered).
    Advance,
    /// Leave the offset untouched; the message will be redelivered.
    Retry,
}

/// Consumer wiring for one worker.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub bootstrap_servers: String,
    pub group_id: String,
    pub input_topic: String,
    pub dlq_topic: String,
    pub session_timeout_ms: u64,
    pub max_poll_interval_ms: u64,
}

/// Transactional message processor, decoupled from the Kafka poll loop so
/// the protocol is testable against a database alone.
pub struct MessageProcessor<H: EventHandler> {
    pool: PgPool,
    handler: H,
    dlq: Arc<dyn DlqSink>,
    consumer_group: String,
    dlq_topic: String,
}

impl<H: EventHandler> MessageProcessor<H> {
    pub fn new(
        pool: PgPool,
        handler: H,
        dlq: Arc<dyn DlqSink>,
        consumer_group: impl Into<String>,
        dlq_topic: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            handler,
            dlq,
            consumer_group: consumer_group.into(),
            dlq_topic: dlq_topic.into(),
        }
    }

    /// The wrapped handler (exposed for tests and monitoring).
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Process one message given its raw parts.
    ///
    /// Returns the advance/retry decision; framework-level failures
    /// (transaction begin/commit, ledger access) bubble up as errors and
    /// the caller must not advance.
    pub async fn process(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
        key: Option<&[u8]>,
        payload: &[u8],
    ) -> ConsumerResult<Disposition> {
        let event: H::Event = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    topic = %topic,
                    partition,
                    offset,
                    error = %e,
                    "Malformed payload, routing to DLQ"
                );
                return Ok(self.dead_letter(key, payload).await);
            }
        };

        let aggregate_id = event.aggregate_id();
        let fingerprint = message_fingerprint(aggregate_id, topic, partition, offset);

        let mut tx = self.pool.begin().await.map_err(loan_store::StoreError::from)?;

        if processed::is_processed(&mut *tx, &fingerprint).await? {
            debug!(message_id = %fingerprint, "Message already processed, skipping");
            tx.commit().await.map_err(loan_store::StoreError::from)?;
            return Ok(Disposition::Advance);
        }

        match self.handler.handle(&mut tx, event).await {
            Ok(()) => {
                let ledger_entry = NewProcessedMessage {
                    message_id: fingerprint.clone(),
                    topic_name: topic.to_string(),
                    partition_num: partition,
                    offset_num: offset,
                    consumer_group: self.consumer_group.clone(),
                };
                match processed::record_processed(&mut tx, &ledger_entry).await {
                    Ok(()) => {}
                    Err(loan_store::StoreError::DuplicateMessage { .. }) => {
                        // A concurrent consumer committed first; our
                        // side-effects roll back and redelivery resolves
                        // through the ledger check
                        warn!(
                            message_id = %fingerprint,
                            "Lost idempotency race, rolling back"
                        );
                        tx.rollback().await.map_err(loan_store::StoreError::from)?;
                        return Ok(Disposition::Retry);
                    }
                    Err(e) => return Err(e.into()),
                }

                tx.commit().await.map_err(loan_store::StoreError::from)?;
                debug!(message_id = %fingerprint, "Message processed");
                Ok(Disposition::Advance)
            }
            Err(HandlerError::Transient(e)) => {
                warn!(
                    message_id = %fingerprint,
                    error = %e,
                    "Transient failure, message will be redelivered"
                );
                tx.rollback().await.map_err(loan_store::StoreError::from)?;
                Ok(Disposition::Retry)
            }
            Err(HandlerError::Validation(reason)) => {
                warn!(
                    message_id = %fingerprint,
                    reason = %reason,
                    "Validation failure, routing to DLQ"
                );
                tx.rollback().await.map_err(loan_store::StoreError::from)?;
                Ok(self.dead_letter(key, payload).await)
            }
            Err(HandlerError::Permanent(reason)) => {
                error!(
                    message_id = %fingerprint,
                    reason = %reason,
                    "Permanent failure, routing to DLQ"
                );
                tx.rollback().await.map_err(loan_store::StoreError::from)?;

                // The audit entry must land before the offset moves; if it
                // cannot be written the message is replayed instead
                audit::append_audit(
                    &self.pool,
                    aggregate_id,
                    &self.consumer_group,
                    AuditOperation::PermanentFailure,
                )
                .await?;

                Ok(self.dead_letter(key, payload).await)
            }
        }
    }

    /// Forward a message to the DLQ. Advances only when the DLQ write
    /// succeeded; otherwise the source message is redelivered.
    async fn dead_letter(&self, key: Option<&[u8]>, payload: &[u8]) -> Disposition {
        match self.dlq.send(&self.dlq_topic, key, payload).await {
            Ok(()) => Disposition::Advance,
            Err(e) => {
                error!(
                    dlq_topic = %self.dlq_topic,
                    error = %e,
                    "DLQ publish failed, message will be redelivered"
                );
                Disposition::Retry
            }
        }
    }
}

/// Kafka poll loop wrapping a [`MessageProcessor`].
pub struct IdempotentConsumer<H: EventHandler> {
    consumer: StreamConsumer,
    processor: MessageProcessor<H>,
    input_topic: String,
    running: AtomicBool,
}

impl<H: EventHandler> IdempotentConsumer<H> {
    /// Build the consumer and subscribe to the input topic.
    ///
    /// Auto-commit is disabled: offsets move only after the database
    /// transaction committed.
    pub fn new(config: &ConsumerConfig, pool: PgPool, handler: H) -> ConsumerResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .set("max.poll.interval.ms", config.max_poll_interval_ms.to_string())
            .create()?;

        consumer.subscribe(&[config.input_topic.as_str()])?;
        info!(topic = %config.input_topic, group = %config.group_id, "Subscribed to topic");

        let dlq: Arc<dyn DlqSink> = Arc::new(KafkaDlqSink::new(
            &config.bootstrap_servers,
            &format!("{}-dlq", config.group_id),
        )?);

        Ok(Self {
            consumer,
            processor: MessageProcessor::new(
                pool,
                handler,
                dlq,
                config.group_id.clone(),
                config.dlq_topic.clone(),
            ),
            input_topic: config.input_topic.clone(),
            running: AtomicBool::new(false),
        })
    }

    /// Poll until [`stop`](Self::stop) is called. The in-flight message
    /// always finishes transactionally before the loop exits.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(topic = %self.input_topic, "Consumer loop started");

        while self.running.load(Ordering::SeqCst) {
            let msg = match tokio::time::timeout(POLL_TIMEOUT, self.consumer.recv()).await {
                Err(_) => continue, // poll timeout, re-check running flag
                Ok(Err(e)) => {
                    warn!(error = %e, "Kafka consumer error");
                    continue;
                }
                Ok(Ok(msg)) => msg,
            };

            self.handle_message(&msg).await;
        }

        info!(topic = %self.input_topic, "Consumer loop stopped");
    }

    /// Signal the loop to stop after the in-flight message.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn handle_message(&self, msg: &BorrowedMessage<'_>) {
        let payload = msg.payload().unwrap_or_default();

        let disposition = match self
            .processor
            .process(msg.topic(), msg.partition(), msg.offset(), msg.key(), payload)
            .await
        {
            Ok(disposition) => disposition,
            Err(e) => {
                // Framework failure (database unreachable, ledger access):
                // transient by definition
                error!(
                    topic = %msg.topic(),
                    partition = msg.partition(),
                    offset = msg.offset(),
                    error = %e,
                    "Message processing failed, will be redelivered"
                );
                Disposition::Retry
            }
        };

        if disposition == Disposition::Advance {
            if let Err(e) = self.consumer.commit_message(msg, CommitMode::Async) {
                warn!(error = %e, "Failed to commit Kafka offset");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_fingerprint_format() {
        let id = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
        assert_eq!(
            message_fingerprint(id, "loan_applications_submitted", 2, 99),
            "123e4567-e89b-12d3-a456-426614174000:loan_applications_submitted:2:99"
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_redelivery_coordinates() {
        let id = Uuid::new_v4();
        let base = message_fingerprint(id, "t", 0, 1);
        assert_ne!(base, message_fingerprint(id, "t", 0, 2));
        assert_ne!(base, message_fingerprint(id, "t", 1, 1));
        assert_ne!(base, message_fingerprint(id, "u", 0, 1));
    }
}
