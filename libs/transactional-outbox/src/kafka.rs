//! Kafka implementation of the outbox publisher seam.

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, warn};

use loan_store::model::OutboxEventRow;

use crate::{OutboxError, OutboxPublisher, OutboxResult};

/// Delivery is awaited synchronously inside the batch cycle.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes outbox rows to Kafka.
///
/// Producer settings preserve per-key ordering across retries:
/// `acks=all` waits for full in-sync-replica replication and
/// `max.in.flight.requests.per.connection=1` keeps at most one request
/// outstanding per broker connection.
pub struct KafkaOutboxPublisher {
    producer: FutureProducer,
}

impl KafkaOutboxPublisher {
    pub fn new(bootstrap_servers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", "outbox-publisher")
            .set("acks", "all")
            .set("retries", "3")
            .set("max.in.flight.requests.per.connection", "1")
            .set("compression.type", "gzip")
            .set("linger.ms", "10")
            .create()?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl OutboxPublisher for KafkaOutboxPublisher {
    async fn publish(&self, event: &OutboxEventRow) -> OutboxResult<()> {
        // Payload travels verbatim as stored in the outbox row
        let payload = serde_json::to_string(&event.payload)?;

        let record = FutureRecord::to(&event.topic_name)
            .key(event.partition_key.as_bytes())
            .payload(&payload);

        self.producer
            .send(record, DELIVERY_TIMEOUT)
            .await
            .map_err(|(err, _)| OutboxError::PublishFailed(err.to_string()))?;

        debug!(
            outbox_id = event.id,
            aggregate_id = %event.aggregate_id,
            topic = %event.topic_name,
            "Event delivered to Kafka"
        );

        Ok(())
    }

    fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            warn!(error = %e, "Kafka producer flush incomplete at shutdown");
        }
    }
}
