//! Tradefeed Ingest - publish captured trades to Kafka

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tradefeed_common::logging::{init_logging, LogConfig, LogLevel};
use tradefeed_ingest::config::IngestArgs;
use tradefeed_ingest::pipeline;

#[derive(Parser, Debug)]
#[command(name = "tradefeed-ingest")]
#[command(author, version, about = "Publish trades from a CSV file to a Kafka topic")]
struct Cli {
    #[command(flatten)]
    ingest: IngestArgs,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env become visible to clap's env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("tradefeed-ingest")
        .filter_directives("rdkafka=warn")
        .build()
        .with_env_overrides()?;

    let _guard = init_logging(&log_config)?;

    let config = match cli.ingest.into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        },
    };

    match pipeline::ingest(&config).await {
        Ok(summary) => {
            info!(
                rows_read = summary.rows_read,
                published = summary.published,
                failed = summary.failed,
                invalid_prices = summary.invalid_prices,
                "Ingestion complete"
            );
            Ok(())
        },
        Err(e) => {
            error!(error = %e, "Ingestion failed");
            Err(e.into())
        },
    }
}
