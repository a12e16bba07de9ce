use std::sync::Arc;
use std::time::Duration;

use restock_aggregator::{telemetry, Aggregator, HealthMonitor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = restock_core::load_app_config()?;
    telemetry::init_tracing(&config.log_level)?;

    let file = restock_core::load_retailers(&config.retailers_path)?;
    let aggregator = Arc::new(Aggregator::from_config(&config, file.retailers)?);
    tracing::info!(
        env = %config.env,
        retailers = ?aggregator.retailer_ids(),
        "restock monitor starting"
    );

    let monitor = HealthMonitor::start(
        Arc::clone(&aggregator),
        Duration::from_secs(config.health_interval_secs),
    )
    .await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    monitor.shutdown().await?;
    Ok(())
}
