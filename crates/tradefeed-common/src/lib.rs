//! Tradefeed Common Library
//!
//! Shared types and logging setup for the tradefeed workspace.
//!
//! # Overview
//!
//! - **Types**: the raw row read from a trade capture file and the normalized
//!   [`TradeRecord`] published to the broker
//! - **Logging**: `tracing` subscriber configuration used by every binary
//!
//! # Example
//!
//! ```no_run
//! use tradefeed_common::logging::{init_logging, LogConfig};
//! use tradefeed_common::TradeRecord;
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     let trade = TradeRecord::new("So11111111111111111111111111111111111111112", 1.5, "2024-01-01T00:00:00Z");
//!     tracing::info!(%trade, "Built trade");
//!     Ok(())
//! }
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{RawRow, TradeRecord};
