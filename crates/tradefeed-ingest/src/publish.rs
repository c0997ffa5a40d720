//! Trade publisher
//!
//! One connection for the whole run, one message per trade, one message in
//! flight at a time: `publish` returns only after the broker acknowledged
//! (or rejected) the message.

use crate::config::KafkaConfig;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{error, info};
use tradefeed_common::TradeRecord;

/// Broker acknowledgment for a published trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Sends trades to the destination topic
#[async_trait]
pub trait Publisher: Send {
    /// Open the broker connection
    async fn connect(&mut self) -> Result<()>;

    /// Publish one trade and wait for its acknowledgment
    async fn publish(&mut self, record: &TradeRecord) -> Result<Delivery>;

    /// Flush and release the connection
    async fn disconnect(&mut self) -> Result<()>;
}

/// Publisher backed by an rdkafka producer
pub struct KafkaPublisher {
    kafka: KafkaConfig,
    topic: String,
    producer: Option<FutureProducer>,
}

impl KafkaPublisher {
    pub fn new(kafka: KafkaConfig, topic: impl Into<String>) -> Self {
        Self {
            kafka,
            topic: topic.into(),
            producer: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.producer.is_some()
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let producer: FutureProducer = self
            .kafka
            .producer_config()
            .create()
            .map_err(|e| IngestError::connection(format!("failed to create producer: {}", e)))?;

        // Creating the producer does not contact the broker; a metadata
        // round-trip does.
        let probe = producer.clone();
        let timeout = self.kafka.message_timeout;
        tokio::task::spawn_blocking(move || probe.client().fetch_metadata(None, timeout).map(|_| ()))
            .await
            .map_err(|e| IngestError::connection(format!("connection check aborted: {}", e)))?
            .map_err(|e| {
                IngestError::connection(format!(
                    "brokers {} unreachable: {}",
                    self.kafka.brokers.join(","),
                    e
                ))
            })?;

        info!(
            brokers = %self.kafka.brokers.join(","),
            client_id = %self.kafka.client_id,
            "Producer connected"
        );
        self.producer = Some(producer);
        Ok(())
    }

    async fn publish(&mut self, record: &TradeRecord) -> Result<Delivery> {
        let producer = self
            .producer
            .as_ref()
            .ok_or_else(|| IngestError::publish(&self.topic, "publisher is not connected"))?;

        let payload = record.to_json()?;
        let message = FutureRecord::<(), str>::to(&self.topic).payload(&payload);

        match producer.send(message, self.kafka.message_timeout).await {
            Ok((partition, offset)) => {
                info!(
                    token_address = %record.token_address(),
                    price_in_sol = record.price_in_sol(),
                    block_time = %record.block_time(),
                    partition,
                    offset,
                    "Published trade"
                );
                Ok(Delivery { partition, offset })
            },
            Err((e, _message)) => {
                error!(
                    token_address = %record.token_address(),
                    topic = %self.topic,
                    error = %e,
                    "Error publishing trade"
                );
                Err(IngestError::publish(&self.topic, e.to_string()))
            },
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(producer) = self.producer.take() else {
            return Ok(());
        };

        let timeout = self.kafka.message_timeout;
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| IngestError::connection(format!("flush aborted: {}", e)))?
            .map_err(|e| IngestError::connection(format!("failed to flush producer: {}", e)))?;

        info!("Producer disconnected");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;

    fn publisher() -> KafkaPublisher {
        let config = IngestConfig::default();
        KafkaPublisher::new(config.kafka, config.topic.name)
    }

    #[tokio::test]
    async fn test_publish_before_connect_fails() {
        let mut publisher = publisher();
        let trade = TradeRecord::new("T1", 1.5, "2024-01-01T00:00:00Z");

        let err = publisher.publish(&trade).await.unwrap_err();
        assert!(matches!(err, IngestError::Publish { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_disconnect_without_connection_is_noop() {
        let mut publisher = publisher();
        assert!(!publisher.is_connected());
        publisher.disconnect().await.unwrap();
    }
}
