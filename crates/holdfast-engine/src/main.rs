//! Simulation engine binary for Holdfast.
//!
//! Wires the tick scheduler to `PostgreSQL` and NATS and runs until the
//! process receives Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `holdfast-config.yaml` (plus environment
//!    overrides)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Connect to NATS for event fan-out
//! 5. Resume the tick counter from the stored claim markers and start the
//!    scheduler
//! 6. On Ctrl-C, stop the scheduler and drain in-flight passes

mod error;
mod nats_publisher;

use std::path::Path;
use std::sync::Arc;

use holdfast_core::{Engine, EngineConfig, Scheduler, SystemClock};
use holdfast_db::{PostgresConfig, PostgresPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;
use crate::nats_publisher::NatsPublisher;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "holdfast-config.yaml";

/// Application entry point for the simulation engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // 1. Load configuration. Logging is not up yet, so report where it came
    //    from once it is.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config);
    info!(
        from_file,
        tick_rate = config.scheduler.tick_rate,
        resource_interval_seconds = config.scheduler.resource_interval_seconds,
        population_interval_seconds = config.scheduler.population_interval_seconds,
        batch_size = config.scheduler.batch_size,
        "Configuration loaded"
    );

    // 3. Connect to PostgreSQL.
    let pool = PostgresPool::connect(&PostgresConfig::from_infrastructure(&config.infrastructure)).await?;
    pool.migrate().await?;
    let store = Arc::new(pool.store());

    // 4. Connect to NATS.
    let nats_url = config.infrastructure.nats_url.clone();
    info!(nats_url = %nats_url, "Connecting to NATS");
    let publisher = NatsPublisher::connect(&nats_url)
        .await
        .map_err(|message| StartupError::Nats { message })?;
    let publisher = Arc::new(publisher);
    info!("NATS publisher connected");

    // 5. Start the scheduler.
    let engine = Arc::new(Engine::new(
        store,
        Arc::clone(&publisher),
        Arc::new(SystemClock),
        config,
    ));
    let scheduler = Arc::new(Scheduler::resume(engine).await?);
    scheduler.start().await;
    info!("holdfast-engine running, press Ctrl-C to stop");

    // 6. Wait for shutdown.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    scheduler.stop().await;

    if let Err(e) = publisher.flush().await {
        tracing::warn!(error = %e, "Failed to flush NATS on shutdown");
    }
    pool.close().await;

    let status = scheduler.status();
    info!(
        current_tick = status.current_tick,
        "holdfast-engine shutdown complete"
    );
    Ok(())
}

/// Load `holdfast-config.yaml`, falling back to defaults when it is absent.
///
/// Environment overrides apply either way. Returns whether a file was read.
fn load_config() -> Result<(EngineConfig, bool), StartupError> {
    let path = Path::new(CONFIG_PATH);
    if path.exists() {
        return Ok((EngineConfig::from_file(path)?, true));
    }
    let mut config = EngineConfig::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok((config, false))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
