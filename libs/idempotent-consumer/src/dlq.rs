//! Dead-letter routing for messages that fail permanently.
//!
//! Payloads are forwarded verbatim with the original key so the DLQ
//! preserves per-aggregate grouping. A failed DLQ publish downgrades the
//! failure to transient: the source offset is not advanced and the
//! message is redelivered rather than lost.

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::info;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sink for dead-lettered messages.
#[async_trait]
pub trait DlqSink: Send + Sync {
    async fn send(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> anyhow::Result<()>;
}

/// Kafka-backed dead-letter sink.
pub struct KafkaDlqSink {
    producer: FutureProducer,
}

impl KafkaDlqSink {
    pub fn new(bootstrap_servers: &str, client_id: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("client.id", client_id)
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "1")
            .create()?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl DlqSink for KafkaDlqSink {
    async fn send(&self, topic: &str, key: Option<&[u8]>, payload: &[u8]) -> anyhow::Result<()> {
        let delivery = match key {
            Some(key) => {
                let record = FutureRecord::to(topic).payload(payload).key(key);
                self.producer.send(record, DELIVERY_TIMEOUT).await
            }
            None => {
                let record = FutureRecord::<(), _>::to(topic).payload(payload);
                self.producer.send(record, DELIVERY_TIMEOUT).await
            }
        };

        delivery.map_err(|(err, _)| anyhow::anyhow!("DLQ publish failed: {err}"))?;

        info!(topic = %topic, "Message routed to dead-letter topic");
        Ok(())
    }
}
