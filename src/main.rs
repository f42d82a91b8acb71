mod bus;
mod config;
mod scene;
mod simulation;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bus::Topic;
use simulation::TelemetryFrame;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Campsite simulation starting");

    let config = config::load_config().context("failed to load configuration")?;
    config.validate()?;
    simulation::check_reachable(&config)?;

    let telemetry: Topic<TelemetryFrame> = Topic::new(64);
    let logger = tokio::spawn(simulation::log_telemetry(telemetry.subscribe()));

    let result = simulation::run(config, telemetry).await;
    if let Err(e) = &result {
        error!("Simulation failed: {:?}", e);
    }
    logger.await.context("telemetry logger panicked")?;
    result
}
