//! # GPS Bridge
//!
//! Bridge GPS and LoRa positional telemetry from field nodes to a fleet
//! tracking server.
//!
//! The binary wires the pieces together: load configuration, open the
//! enabled telemetry sources (fatal if one cannot be opened — a pipeline
//! without its source has nothing to decode), probe the collector, then
//! hand control to the polling loop until Ctrl-C.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use gps_bridge::config::Config;
use gps_bridge::forward::Forwarder;
use gps_bridge::pipeline::{Pipeline, SourceKind};
use gps_bridge::source::open_serial_source;

/// Config file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("GPS Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    info!("forwarding to {}", config.collector.url());

    let forwarder = Forwarder::new(
        config.collector.url(),
        Duration::from_secs(config.collector.timeout_secs),
    )?;

    // Reachability probe; a collector outage is not fatal, records simply
    // start failing until it comes back
    match forwarder.check_connectivity().await {
        Ok(()) => info!("collector reachable"),
        Err(e) => warn!("collector probe failed: {} (continuing anyway)", e),
    }

    let mut pipeline = Pipeline::new(&config, forwarder);

    if config.gps.enabled {
        let source = open_serial_source("gps", &config.gps.device_paths, config.gps.baud_rate)?;
        pipeline.add_source(SourceKind::DeviceNmea, source);
    }

    if config.radio.enabled {
        let source =
            open_serial_source("radio", &config.radio.device_paths, config.radio.baud_rate)?;
        pipeline.add_source(SourceKind::RadioPayload, source);
    }

    info!("press Ctrl+C to exit");
    pipeline.run().await?;

    Ok(())
}
