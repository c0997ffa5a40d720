//! Configuration management
//!
//! Settings come from command-line flags, which fall back to `TRADEFEED_*`
//! environment variables (a `.env` file is honoured), which fall back to the
//! defaults below. The resulting [`IngestConfig`] is handed to the
//! provisioner and publisher explicitly; nothing reads global client state.

use crate::error::{IngestError, Result};
use clap::{Args, ValueEnum};
use rdkafka::ClientConfig;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Default trade capture file.
pub const DEFAULT_INPUT_PATH: &str = "trades_data.csv";

/// Default bootstrap broker list.
pub const DEFAULT_BROKERS: &str = "localhost:19092";

/// Client identifier sent to the broker on connect.
pub const DEFAULT_CLIENT_ID: &str = "trade-ingestor";

/// Destination topic.
pub const DEFAULT_TOPIC: &str = "trade-data";

/// Partition count used when the topic is created.
pub const DEFAULT_PARTITIONS: i32 = 1;

/// Replication factor used when the topic is created.
pub const DEFAULT_REPLICATION_FACTOR: i32 = 1;

/// Default field delimiter of the trade file.
pub const DEFAULT_DELIMITER: char = ',';

/// Default time the broker has to acknowledge a message, in milliseconds.
pub const DEFAULT_MESSAGE_TIMEOUT_MS: u64 = 30_000;

/// Default time to wait for partition leaders after topic creation, in milliseconds.
pub const DEFAULT_LEADER_TIMEOUT_MS: u64 = 30_000;

/// How records move from the file to the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReadMode {
    /// Read, normalize and publish one row at a time
    #[default]
    Streaming,
    /// Read the whole file into memory before publishing anything
    Buffered,
}

impl std::fmt::Display for ReadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadMode::Streaming => write!(f, "streaming"),
            ReadMode::Buffered => write!(f, "buffered"),
        }
    }
}

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub client_id: String,
    pub message_timeout: Duration,
}

impl KafkaConfig {
    /// Base client configuration shared by the admin client and the producer
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.brokers.join(","))
            .set("client.id", &self.client_id);
        config
    }

    /// Producer configuration: every message waits for full acknowledgment
    /// and is never retried by the client.
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = self.client_config();
        config
            .set("acks", "all")
            .set("message.send.max.retries", "0")
            .set("message.timeout.ms", self.message_timeout.as_millis().to_string());
        config
    }
}

/// Destination topic settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
    /// Upper bound on waiting for partition leaders after creation
    pub leader_timeout: Duration,
}

/// Trade file settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub delimiter: u8,
}

/// Complete configuration for one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub kafka: KafkaConfig,
    pub topic: TopicConfig,
    pub source: SourceConfig,
    pub mode: ReadMode,
}

impl IngestConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.kafka.brokers.is_empty() {
            return Err(IngestError::config("at least one broker address is required"));
        }

        if self.kafka.brokers.iter().any(|b| b.trim().is_empty()) {
            return Err(IngestError::config("broker addresses cannot be blank"));
        }

        if self.kafka.client_id.trim().is_empty() {
            return Err(IngestError::config("client id cannot be empty"));
        }

        if self.kafka.message_timeout.is_zero() {
            return Err(IngestError::config("message timeout must be greater than 0"));
        }

        if self.topic.name.trim().is_empty() {
            return Err(IngestError::config("topic name cannot be empty"));
        }

        if self.topic.partitions < 1 {
            return Err(IngestError::config(format!(
                "partitions must be at least 1, got {}",
                self.topic.partitions
            )));
        }

        if self.topic.replication_factor < 1 {
            return Err(IngestError::config(format!(
                "replication factor must be at least 1, got {}",
                self.topic.replication_factor
            )));
        }

        if self.topic.leader_timeout.is_zero() {
            return Err(IngestError::config("leader timeout must be greater than 0"));
        }

        Ok(())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            kafka: KafkaConfig {
                brokers: vec![DEFAULT_BROKERS.to_string()],
                client_id: DEFAULT_CLIENT_ID.to_string(),
                message_timeout: Duration::from_millis(DEFAULT_MESSAGE_TIMEOUT_MS),
            },
            topic: TopicConfig {
                name: DEFAULT_TOPIC.to_string(),
                partitions: DEFAULT_PARTITIONS,
                replication_factor: DEFAULT_REPLICATION_FACTOR,
                leader_timeout: Duration::from_millis(DEFAULT_LEADER_TIMEOUT_MS),
            },
            source: SourceConfig {
                path: PathBuf::from(DEFAULT_INPUT_PATH),
                delimiter: DEFAULT_DELIMITER as u8,
            },
            mode: ReadMode::default(),
        }
    }
}

/// Command-line options for an ingestion run
#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Trade capture file (delimited, with a header row)
    #[arg(short, long, env = "TRADEFEED_INPUT", default_value = DEFAULT_INPUT_PATH)]
    pub input: PathBuf,

    /// Comma-separated broker addresses
    #[arg(
        short,
        long,
        env = "TRADEFEED_BROKERS",
        value_delimiter = ',',
        default_value = DEFAULT_BROKERS
    )]
    pub brokers: Vec<String>,

    /// Client identifier sent to the broker
    #[arg(long, env = "TRADEFEED_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Destination topic
    #[arg(short, long, env = "TRADEFEED_TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Partition count used if the topic has to be created
    #[arg(long, env = "TRADEFEED_PARTITIONS", default_value_t = DEFAULT_PARTITIONS, allow_negative_numbers = true)]
    pub partitions: i32,

    /// Replication factor used if the topic has to be created
    #[arg(long, env = "TRADEFEED_REPLICATION_FACTOR", default_value_t = DEFAULT_REPLICATION_FACTOR, allow_negative_numbers = true)]
    pub replication_factor: i32,

    /// Publish while reading, or read the whole file first
    #[arg(long, env = "TRADEFEED_MODE", value_enum, default_value_t = ReadMode::Streaming)]
    pub mode: ReadMode,

    /// Field delimiter of the trade file
    #[arg(long, env = "TRADEFEED_DELIMITER", default_value_t = DEFAULT_DELIMITER)]
    pub delimiter: char,

    /// Time the broker has to acknowledge each message (ms)
    #[arg(long, env = "TRADEFEED_MESSAGE_TIMEOUT_MS", default_value_t = DEFAULT_MESSAGE_TIMEOUT_MS)]
    pub message_timeout_ms: u64,

    /// Time to wait for partition leaders after creating the topic (ms)
    #[arg(long, env = "TRADEFEED_LEADER_TIMEOUT_MS", default_value_t = DEFAULT_LEADER_TIMEOUT_MS)]
    pub leader_timeout_ms: u64,
}

impl IngestArgs {
    /// Build and validate the run configuration
    pub fn into_config(self) -> Result<IngestConfig> {
        if !self.delimiter.is_ascii() {
            return Err(IngestError::config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }

        let config = IngestConfig {
            kafka: KafkaConfig {
                brokers: self
                    .brokers
                    .into_iter()
                    .map(|b| b.trim().to_string())
                    .collect(),
                client_id: self.client_id,
                message_timeout: Duration::from_millis(self.message_timeout_ms),
            },
            topic: TopicConfig {
                name: self.topic,
                partitions: self.partitions,
                replication_factor: self.replication_factor,
                leader_timeout: Duration::from_millis(self.leader_timeout_ms),
            },
            source: SourceConfig {
                path: self.input,
                delimiter: self.delimiter as u8,
            },
            mode: self.mode,
        };

        config.validate()?;

        Ok(config)
    }
}
