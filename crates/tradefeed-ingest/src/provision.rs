//! Destination topic provisioning
//!
//! Creating a topic that already exists counts as success. After creation
//! the provisioner waits until every partition reports a leader, so the
//! first publish does not race the new topic becoming available.

use crate::config::{KafkaConfig, TopicConfig};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::{Client, DefaultClientContext};
use rdkafka::types::RDKafkaErrorCode;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Delay between metadata polls while waiting for partition leaders.
const LEADER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How an `ensure_topic` call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

/// Makes sure the destination topic exists before publishing starts
#[async_trait]
pub trait TopicProvisioner: Send + Sync {
    async fn ensure_topic(&self, topic: &TopicConfig) -> Result<ProvisionOutcome>;
}

/// Provisioner backed by the Kafka admin API
pub struct KafkaTopicProvisioner {
    kafka: KafkaConfig,
}

impl KafkaTopicProvisioner {
    pub fn new(kafka: KafkaConfig) -> Self {
        Self { kafka }
    }
}

#[async_trait]
impl TopicProvisioner for KafkaTopicProvisioner {
    async fn ensure_topic(&self, topic: &TopicConfig) -> Result<ProvisionOutcome> {
        let admin: AdminClient<DefaultClientContext> =
            self.kafka.client_config().create().map_err(|e| {
                IngestError::provision(&topic.name, format!("failed to create admin client: {}", e))
            })?;

        let new_topic = NewTopic::new(
            &topic.name,
            topic.partitions,
            TopicReplication::Fixed(topic.replication_factor),
        );
        let options = AdminOptions::new()
            .operation_timeout(Some(topic.leader_timeout))
            .request_timeout(Some(topic.leader_timeout));

        debug!(
            topic = %topic.name,
            partitions = topic.partitions,
            replication_factor = topic.replication_factor,
            "Creating topic"
        );

        let results = admin
            .create_topics(&[new_topic], &options)
            .await
            .map_err(|e| IngestError::provision(&topic.name, e.to_string()))?;
        let outcome = creation_outcome(&topic.name, results)?;

        match outcome {
            ProvisionOutcome::Created => info!(topic = %topic.name, "Created topic"),
            ProvisionOutcome::AlreadyExists => info!(topic = %topic.name, "Topic already exists"),
        }

        let name = topic.name.clone();
        let timeout = topic.leader_timeout;
        tokio::task::spawn_blocking(move || wait_for_leaders(admin.inner(), &name, timeout))
            .await
            .map_err(|e| IngestError::provision(&topic.name, format!("leader wait aborted: {}", e)))??;

        info!(topic = %topic.name, "All partition leaders elected");
        Ok(outcome)
    }
}

/// Interpret the per-topic results of a create request
fn creation_outcome(topic: &str, results: Vec<TopicResult>) -> Result<ProvisionOutcome> {
    let mut outcome = None;

    for result in results {
        match result {
            Ok(name) if name == topic => outcome = Some(ProvisionOutcome::Created),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) if name == topic => {
                outcome = Some(ProvisionOutcome::AlreadyExists)
            },
            Err((name, code)) if name == topic => {
                return Err(IngestError::provision(topic, code.to_string()))
            },
            _ => {},
        }
    }

    outcome.ok_or_else(|| IngestError::provision(topic, "broker returned no result for topic"))
}

/// Poll topic metadata until every partition has a leader
fn wait_for_leaders(
    client: &Client<DefaultClientContext>,
    topic: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(IngestError::provision(
                topic,
                format!("partition leaders not available after {:?}", timeout),
            ));
        }

        match client.fetch_metadata(Some(topic), remaining) {
            Ok(metadata) => {
                let ready = metadata
                    .topics()
                    .iter()
                    .find(|t| t.name() == topic)
                    .is_some_and(|t| {
                        t.error().is_none()
                            && !t.partitions().is_empty()
                            && t.partitions().iter().all(|p| p.error().is_none() && p.leader() >= 0)
                    });

                if ready {
                    return Ok(());
                }
                debug!(topic, "Waiting for partition leaders");
            },
            Err(e) => debug!(topic, error = %e, "Metadata request failed while waiting for leaders"),
        }

        std::thread::sleep(LEADER_POLL_INTERVAL.min(remaining));
    }
}
