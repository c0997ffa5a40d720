//! Tradefeed Ingest Library
//!
//! Replays a file of captured trades into a Kafka topic so downstream
//! consumers can read historical trades as a stream.
//!
//! # Pipeline
//!
//! - **provision**: create the destination topic if needed and wait for its leaders
//! - **source**: read the delimited trade file row by row
//! - **normalize**: fill in defaults for missing or invalid fields
//! - **publish**: send each trade as one JSON message and wait for the ack
//! - **pipeline**: run the stages in order and decide which errors are fatal
//!
//! # Example
//!
//! ```no_run
//! use tradefeed_ingest::config::IngestConfig;
//! use tradefeed_ingest::pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = IngestConfig::default();
//!     config.source.path = "./data/trades_data.csv".into();
//!     config.validate()?;
//!
//!     let summary = pipeline::ingest(&config).await?;
//!     println!("published {} of {} trades", summary.published, summary.rows_read);
//!     Ok(())
//! }
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod provision;
pub mod publish;
pub mod source;

pub use error::{IngestError, Result};
pub use pipeline::{Pipeline, RunSummary};
