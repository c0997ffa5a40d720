//! Error types for trade ingestion
//!
//! Configuration, source, provisioning and connection errors end the run.
//! Publish and serialization errors concern a single record; the pipeline
//! logs them and moves on to the next one.

use std::path::Path;
use thiserror::Error;

/// Result type alias for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error type for ingest operations
#[derive(Error, Debug)]
pub enum IngestError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Trade file is missing, unreadable, or contains a malformed line
    #[error("Failed to read trades from '{path}': {source}")]
    SourceRead {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Destination topic could not be created or verified
    #[error("Failed to provision topic '{topic}': {message}")]
    Provision { topic: String, message: String },

    /// Broker could not be reached
    #[error("Broker connection failed: {0}")]
    Connection(String),

    /// Broker rejected or never acknowledged a message
    #[error("Failed to publish to topic '{topic}': {message}")]
    Publish { topic: String, message: String },

    /// Trade could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a source read error for the given file
    pub fn source_read(path: &Path, source: csv::Error) -> Self {
        Self::SourceRead {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a provisioning error
    pub fn provision(topic: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Provision {
            topic: topic.into(),
            message: msg.into(),
        }
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a publish error
    pub fn publish(topic: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: msg.into(),
        }
    }

    /// Whether this error ends the whole run rather than a single record
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Publish { .. } | Self::Serialization(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(IngestError::config("no brokers").is_fatal());
        assert!(IngestError::provision("trade-data", "not authorized").is_fatal());
        assert!(IngestError::connection("all brokers down").is_fatal());
        assert!(!IngestError::publish("trade-data", "message timed out").is_fatal());
    }

    #[test]
    fn test_messages_name_the_topic() {
        let err = IngestError::publish("trade-data", "Message timed out");
        assert_eq!(
            err.to_string(),
            "Failed to publish to topic 'trade-data': Message timed out"
        );

        let err = IngestError::provision("trade-data", "Broker: Topic authorization failed");
        assert!(err.to_string().contains("'trade-data'"));
    }
}
