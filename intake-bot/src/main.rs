//! Intake Bot - Main entry point.

use anyhow::{Context, Result};
use intake_bot::start_bot;
use intake_common::config::Config;
use intake_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load and validate configuration
    let config = Config::load_with_env().context("Failed to load configuration")?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Intake Bot v{}", env!("CARGO_PKG_VERSION"));

    start_bot(&config).await
}
