//! # roomsensed — room presence daemon
//!
//! Composition root that wires the hub adapter, the per-room presence
//! engines, and the optional motion simulator together.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing from the configured filter
//! - Construct the hub adapter and seed initial entity states
//! - Spawn one presence engine task per valid room, skipping invalid ones
//! - Spawn the motion simulator when enabled
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no room logic belongs here.

mod config;

use std::sync::Arc;

use roomsense_adapter_memory::MemoryHub;
use roomsense_adapter_simulator::MotionSimulator;
use roomsense_app::engine::RoomPresence;
use roomsense_app::ports::hub::Hub;
use roomsense_domain::state::Attributes;
use tracing::{error, info, warn};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.filter))
        .init();

    // Hub
    let hub = Arc::new(MemoryHub::new());
    for seed in &config.seed {
        hub.set_state(&seed.entity, &seed.state, Attributes::new())
            .await?;
    }

    // Engines
    let mut tasks = Vec::new();
    for room in &config.room {
        match RoomPresence::new(hub.clone(), room.clone()) {
            Ok(engine) => tasks.push(tokio::spawn(engine.run())),
            Err(error) => {
                error!(room = %room.name, %error, "skipping room with invalid configuration");
            }
        }
    }
    if tasks.is_empty() {
        warn!("no rooms are running; check the [[room]] tables");
    }

    // Simulator
    if config.simulation.enabled {
        let walker = MotionSimulator::new(
            hub.clone(),
            config.simulated_sensors(),
            config.simulation.walk_interval(),
        );
        tasks.push(tokio::spawn(walker.run()));
    }

    info!(rooms = config.room.len(), "roomsensed running");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    for task in &tasks {
        task.abort();
    }

    Ok(())
}
