//! Ingestion pipeline
//!
//! Runs the stages strictly one after another:
//!
//! ```text
//! Idle -> Provisioning -> Connecting -> Draining -> Publishing -> Disconnecting -> Terminated
//! ```
//!
//! Provisioning, connection and source errors end the run. A failed publish
//! is counted and the next record is published anyway. Once the publisher
//! has connected it is always disconnected, whichever way the run ends.

use crate::config::{IngestConfig, ReadMode, SourceConfig, TopicConfig};
use crate::error::Result;
use crate::normalize::normalize;
use crate::provision::{KafkaTopicProvisioner, TopicProvisioner};
use crate::publish::{KafkaPublisher, Publisher};
use crate::source::RecordSource;
use chrono::Utc;
use tracing::{debug, info, warn};
use tradefeed_common::{RawRow, TradeRecord};

/// Final state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Success,
    Failure,
}

/// Where the pipeline currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Provisioning,
    Connecting,
    Draining,
    Publishing,
    Disconnecting,
    Terminated(Termination),
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Provisioning => write!(f, "provisioning"),
            PipelineState::Connecting => write!(f, "connecting"),
            PipelineState::Draining => write!(f, "draining"),
            PipelineState::Publishing => write!(f, "publishing"),
            PipelineState::Disconnecting => write!(f, "disconnecting"),
            PipelineState::Terminated(Termination::Success) => write!(f, "terminated(success)"),
            PipelineState::Terminated(Termination::Failure) => write!(f, "terminated(failure)"),
        }
    }
}

/// Counters for a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rows_read: usize,
    pub published: usize,
    pub failed: usize,
    pub invalid_prices: usize,
}

/// Provision, read, normalize and publish one trade file
pub struct Pipeline<T, P> {
    provisioner: T,
    publisher: P,
    topic: TopicConfig,
    source: SourceConfig,
    mode: ReadMode,
    state: PipelineState,
}

impl<T: TopicProvisioner, P: Publisher> Pipeline<T, P> {
    pub fn new(config: &IngestConfig, provisioner: T, publisher: P) -> Self {
        Self {
            provisioner,
            publisher,
            topic: config.topic.clone(),
            source: config.source.clone(),
            mode: config.mode,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Run the pipeline to completion
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.transition(PipelineState::Provisioning);
        if let Err(e) = self.provisioner.ensure_topic(&self.topic).await {
            self.transition(PipelineState::Terminated(Termination::Failure));
            return Err(e);
        }

        self.transition(PipelineState::Connecting);
        if let Err(e) = self.publisher.connect().await {
            self.transition(PipelineState::Terminated(Termination::Failure));
            return Err(e);
        }

        let outcome = match self.mode {
            ReadMode::Buffered => self.publish_buffered().await,
            ReadMode::Streaming => self.publish_streaming().await,
        };

        self.transition(PipelineState::Disconnecting);
        let disconnected = self.publisher.disconnect().await;

        let result = match (outcome, disconnected) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(disconnect_err)) => {
                warn!(error = %disconnect_err, "Failed to disconnect after aborted run");
                Err(e)
            },
        };

        let termination = if result.is_ok() {
            Termination::Success
        } else {
            Termination::Failure
        };
        self.transition(PipelineState::Terminated(termination));

        result
    }

    /// Read and normalize the whole file, then publish
    async fn publish_buffered(&mut self) -> Result<RunSummary> {
        self.transition(PipelineState::Draining);
        let mut summary = RunSummary::default();

        let source = RecordSource::open(&self.source)?;
        let mut trades = Vec::new();
        for row in source {
            trades.push(normalize_row(&row?, &mut summary));
        }
        info!(count = trades.len(), path = %self.source.path.display(), "Read trades from file");

        self.transition(PipelineState::Publishing);
        for trade in &trades {
            self.publish_one(trade, &mut summary).await;
        }

        info!(
            published = summary.published,
            failed = summary.failed,
            "All trades ingested from file"
        );
        Ok(summary)
    }

    /// Publish each row as soon as it has been read
    async fn publish_streaming(&mut self) -> Result<RunSummary> {
        self.transition(PipelineState::Draining);
        let mut summary = RunSummary::default();

        let source = RecordSource::open(&self.source)?;
        self.transition(PipelineState::Publishing);

        for row in source {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(
                        rows_read = summary.rows_read,
                        published = summary.published,
                        "Stopping after source error"
                    );
                    return Err(e);
                },
            };
            let trade = normalize_row(&row, &mut summary);
            self.publish_one(&trade, &mut summary).await;
        }

        info!(count = summary.rows_read, path = %self.source.path.display(), "Read trades from file");
        info!(
            published = summary.published,
            failed = summary.failed,
            "All trades ingested from file"
        );
        Ok(summary)
    }

    async fn publish_one(&mut self, trade: &TradeRecord, summary: &mut RunSummary) {
        match self.publisher.publish(trade).await {
            Ok(_) => summary.published += 1,
            Err(e) => {
                summary.failed += 1;
                debug!(error = %e, token_address = %trade.token_address(), "Skipping failed trade");
            },
        }
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }
}

fn normalize_row(row: &RawRow, summary: &mut RunSummary) -> TradeRecord {
    summary.rows_read += 1;

    let normalized = normalize(row, Utc::now());
    for issue in &normalized.issues {
        summary.invalid_prices += 1;
        warn!(row = summary.rows_read, %issue, "Defaulted invalid field");
    }

    normalized.record
}

/// Ingest a trade file into Kafka using the given configuration
pub async fn ingest(config: &IngestConfig) -> Result<RunSummary> {
    let provisioner = KafkaTopicProvisioner::new(config.kafka.clone());
    let publisher = KafkaPublisher::new(config.kafka.clone(), config.topic.name.clone());

    info!(
        input = %config.source.path.display(),
        topic = %config.topic.name,
        mode = %config.mode,
        "Starting trade ingestion"
    );

    Pipeline::new(config, provisioner, publisher).run().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::provision::ProvisionOutcome;
    use crate::publish::Delivery;
    use async_trait::async_trait;

    struct StaticProvisioner;

    #[async_trait]
    impl TopicProvisioner for StaticProvisioner {
        async fn ensure_topic(&self, _topic: &TopicConfig) -> Result<ProvisionOutcome> {
            Ok(ProvisionOutcome::AlreadyExists)
        }
    }

    #[derive(Default)]
    struct FailingDisconnect {
        published: usize,
    }

    #[async_trait]
    impl Publisher for FailingDisconnect {
        async fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        async fn publish(&mut self, _record: &TradeRecord) -> Result<Delivery> {
            self.published += 1;
            Ok(Delivery {
                partition: 0,
                offset: self.published as i64 - 1,
            })
        }

        async fn disconnect(&mut self) -> Result<()> {
            Err(IngestError::connection("flush timed out"))
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Draining.to_string(), "draining");
        assert_eq!(
            PipelineState::Terminated(Termination::Success).to_string(),
            "terminated(success)"
        );
    }

    #[test]
    fn test_normalize_row_counts_invalid_prices() {
        let mut summary = RunSummary::default();
        let row: RawRow = [("price_in_sol".to_string(), "bad".to_string())]
            .into_iter()
            .collect();

        let trade = normalize_row(&row, &mut summary);
        assert_eq!(trade.price_in_sol(), 0.0);
        assert_eq!(summary.rows_read, 1);
        assert_eq!(summary.invalid_prices, 1);
    }

    #[tokio::test]
    async fn test_disconnect_failure_fails_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        std::fs::write(&path, "token_address,price_in_sol,block_time\nT1,1,2024-01-01T00:00:00Z\n")
            .unwrap();

        let mut config = IngestConfig::default();
        config.source.path = path;

        let mut pipeline = Pipeline::new(&config, StaticProvisioner, FailingDisconnect::default());
        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, IngestError::Connection(_)));
        assert_eq!(pipeline.publisher().published, 1);
        assert_eq!(
            pipeline.state(),
            PipelineState::Terminated(Termination::Failure)
        );
    }
}
