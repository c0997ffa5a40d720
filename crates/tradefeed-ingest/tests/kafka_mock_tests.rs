//! Kafka publisher tests against rdkafka's in-process mock cluster
//!
//! The mock cluster does not implement the CreateTopics admin API, so topics
//! are created directly on the cluster and only the producer side is driven
//! through `KafkaPublisher`.

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::mocking::MockCluster;
use rdkafka::producer::DefaultProducerContext;
use rdkafka::types::{RDKafkaApiKey, RDKafkaRespErr};
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use std::time::Duration;
use tradefeed_common::TradeRecord;
use tradefeed_ingest::config::KafkaConfig;
use tradefeed_ingest::publish::{Delivery, KafkaPublisher, Publisher};
use tradefeed_ingest::IngestError;

const TOPIC: &str = "trade-data";

fn mock_cluster() -> MockCluster<'static, DefaultProducerContext> {
    let cluster = MockCluster::new(1).unwrap();
    cluster.create_topic(TOPIC, 1, 1).unwrap();
    cluster
}

fn kafka_config(cluster: &MockCluster<'static, DefaultProducerContext>) -> KafkaConfig {
    KafkaConfig {
        brokers: vec![cluster.bootstrap_servers()],
        client_id: "tradefeed-test".to_string(),
        message_timeout: Duration::from_secs(10),
    }
}

fn consumer(cluster: &MockCluster<'static, DefaultProducerContext>) -> StreamConsumer {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", cluster.bootstrap_servers())
        .set("group.id", "tradefeed-test")
        .set("enable.auto.commit", "false")
        .create()
        .unwrap();

    let mut assignment = TopicPartitionList::new();
    assignment
        .add_partition_offset(TOPIC, 0, Offset::Beginning)
        .unwrap();
    consumer.assign(&assignment).unwrap();
    consumer
}

fn trades() -> Vec<TradeRecord> {
    vec![
        TradeRecord::new("T1", 1.5, "2024-01-01T00:00:00Z"),
        TradeRecord::new("UNKNOWN", 0.0, "2024-01-01T00:00:01.000Z"),
        TradeRecord::new("T3", 0.0, "2024-01-02T00:00:00Z"),
    ]
}

#[tokio::test]
async fn test_publish_round_trip_preserves_order_and_body() {
    let cluster = mock_cluster();
    let mut publisher = KafkaPublisher::new(kafka_config(&cluster), TOPIC);

    publisher.connect().await.unwrap();
    assert!(publisher.is_connected());

    let mut deliveries = Vec::new();
    for trade in &trades() {
        deliveries.push(publisher.publish(trade).await.unwrap());
    }
    publisher.disconnect().await.unwrap();
    assert!(!publisher.is_connected());

    assert_eq!(
        deliveries,
        vec![
            Delivery { partition: 0, offset: 0 },
            Delivery { partition: 0, offset: 1 },
            Delivery { partition: 0, offset: 2 },
        ]
    );

    let consumer = consumer(&cluster);
    for expected in trades() {
        let message = tokio::time::timeout(Duration::from_secs(10), consumer.recv())
            .await
            .unwrap()
            .unwrap();

        assert!(message.key().is_none());

        let body: serde_json::Value = serde_json::from_slice(message.payload().unwrap()).unwrap();
        assert_eq!(body.as_object().unwrap().len(), 3);

        let decoded: TradeRecord = serde_json::from_value(body).unwrap();
        assert_eq!(decoded, expected);
    }
}

#[tokio::test]
async fn test_broker_rejection_is_a_non_fatal_publish_error() {
    let cluster = mock_cluster();
    let mut publisher = KafkaPublisher::new(kafka_config(&cluster), TOPIC);
    publisher.connect().await.unwrap();

    cluster.request_errors(
        RDKafkaApiKey::Produce,
        &[RDKafkaRespErr::RD_KAFKA_RESP_ERR_MSG_SIZE_TOO_LARGE],
    );

    let trades = trades();
    let err = publisher.publish(&trades[0]).await.unwrap_err();
    assert!(matches!(err, IngestError::Publish { ref topic, .. } if topic == TOPIC));
    assert!(!err.is_fatal());

    // The connection stays usable for the following trades
    let delivery = publisher.publish(&trades[1]).await.unwrap();
    assert_eq!(delivery.partition, 0);

    publisher.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let cluster = mock_cluster();
    let mut publisher = KafkaPublisher::new(kafka_config(&cluster), TOPIC);

    publisher.connect().await.unwrap();
    publisher.connect().await.unwrap();
    assert!(publisher.is_connected());

    publisher.disconnect().await.unwrap();
    publisher.disconnect().await.unwrap();
    assert!(!publisher.is_connected());
}
