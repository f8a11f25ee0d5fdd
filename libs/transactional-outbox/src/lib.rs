//! Transactional Outbox publisher for the loan prequalification pipeline.
//!
//! Writers co-commit domain rows and `outbox_events` rows in one database
//! transaction; this library drains that table to Kafka with at-least-once
//! delivery. A committed domain event is never lost even if:
//! - The writer crashes after commit but before any publish
//! - Kafka is temporarily unavailable
//! - The publisher process restarts mid-batch
//!
//! ## Batch cycle
//!
//! Every `poll_interval` (default 100 ms) the processor runs one cycle:
//! select up to `batch_size` oldest unpublished rows still under the retry
//! ceiling, publish each through the circuit breaker, and record the
//! outcome (`published = true` or `retry_count + 1` with the error text).
//! All row updates in a cycle commit in a single transaction at the end.
//!
//! ## Ordering
//!
//! Rows drain in `created_at` order and every record is keyed by the
//! aggregate id, so Kafka preserves per-aggregate order end-to-end. Order
//! across aggregates is not guaranteed.
//!
//! ## Failure handling
//!
//! Five consecutive publish failures open the circuit breaker; while open,
//! cycles fail fast without producing bus traffic, and after 30 seconds a
//! half-open probe decides between closing (2 successes) and reopening.
//! A row that accumulates `max_retries` failures is parked in place with
//! `published = false` and its last error preserved; an operator workflow
//! resets such rows out of band.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use loan_store::model::OutboxEventRow;
use loan_store::outbox;

mod circuit_breaker;
mod error;
mod kafka;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState,
};
pub use error::{OutboxError, OutboxResult};
pub use kafka::KafkaOutboxPublisher;

/// Publisher seam for sending outbox rows to the message bus.
///
/// Implementations must only report success once the broker acknowledged
/// the write with full replication.
#[async_trait]
pub trait OutboxPublisher: Send + Sync {
    async fn publish(&self, event: &OutboxEventRow) -> OutboxResult<()>;

    /// Drain any producer-internal buffers at shutdown.
    fn flush(&self, _timeout: Duration) {}
}

/// Processor tunables.
#[derive(Debug, Clone)]
pub struct OutboxProcessorConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_retries: i32,
}

impl Default for OutboxProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 10,
            max_retries: 5,
        }
    }
}

/// Background processor that drains the outbox to the bus.
///
/// Runs as a singleton cooperative loop per intake-writer cluster.
/// Redundant instances are tolerated (the drain query locks rows with
/// `SKIP LOCKED`) but wasteful.
pub struct OutboxProcessor<P: OutboxPublisher> {
    pool: PgPool,
    publisher: Arc<P>,
    breaker: CircuitBreaker,
    config: OutboxProcessorConfig,
    running: AtomicBool,
}

impl<P: OutboxPublisher> OutboxProcessor<P> {
    pub fn new(pool: PgPool, publisher: Arc<P>, config: OutboxProcessorConfig) -> Self {
        Self::with_circuit_breaker(pool, publisher, config, CircuitBreakerConfig::default())
    }

    pub fn with_circuit_breaker(
        pool: PgPool,
        publisher: Arc<P>,
        config: OutboxProcessorConfig,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        Self {
            pool,
            publisher,
            breaker: CircuitBreaker::new(breaker),
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Run the polling loop until [`stop`](Self::stop) is called.
    ///
    /// Cycle errors are logged and the loop keeps going; the next tick
    /// retries from the current table state.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_retries = self.config.max_retries,
            "Outbox processor starting"
        );

        while self.running.load(Ordering::SeqCst) {
            match self.process_batch().await {
                Ok(count) if count > 0 => {
                    info!(published_count = count, "Published events from outbox")
                }
                Ok(_) => debug!("No events to publish"),
                Err(e) => error!(error = %e, "Outbox batch cycle failed"),
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        self.publisher.flush(Duration::from_secs(10));
        info!("Outbox processor stopped");
    }

    /// Signal the loop to stop after the in-flight cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Circuit state, exposed for monitoring.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// One batch cycle. Returns the number of rows published.
    ///
    /// Selection and all row updates share one transaction, committed at
    /// the end of the cycle.
    pub async fn process_batch(&self) -> OutboxResult<usize> {
        let mut tx = self.pool.begin().await.map_err(loan_store::StoreError::from)?;

        let events =
            outbox::fetch_unpublished_batch(&mut tx, self.config.batch_size, self.config.max_retries)
                .await?;

        if events.is_empty() {
            tx.commit().await.map_err(loan_store::StoreError::from)?;
            return Ok(0);
        }

        let mut published = 0usize;

        for event in &events {
            match self.breaker.call(|| self.publisher.publish(event)).await {
                Ok(()) => {
                    outbox::mark_published(&mut tx, event.id).await?;
                    published += 1;
                }
                Err(e) => {
                    warn!(
                        outbox_id = event.id,
                        aggregate_id = %event.aggregate_id,
                        retry_count = event.retry_count,
                        error = %e,
                        "Failed to publish outbox event"
                    );
                    outbox::mark_failed(&mut tx, event.id, &e.to_string()).await?;
                }
            }
        }

        tx.commit().await.map_err(loan_store::StoreError::from)?;
        Ok(published)
    }
}
