//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `roomsense.toml` in the working directory (path override via
//! `ROOMSENSE_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::time::Duration;

use roomsense_domain::entity::EntityId;
use roomsense_domain::room::RoomConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Motion simulator settings.
    pub simulation: SimulationConfig,
    /// Entity states written to the hub before the engines start.
    pub seed: Vec<SeedEntity>,
    /// One table per supervised room.
    pub room: Vec<RoomConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Motion simulator configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Enable the deterministic sensor walker.
    pub enabled: bool,
    /// Seconds between simulated sensor flips.
    pub walk_interval_secs: u64,
}

/// One entity state to seed into the hub at startup, standing in for the
/// discovery a live host would provide.
#[derive(Debug, Deserialize)]
pub struct SeedEntity {
    /// Entity to create.
    pub entity: EntityId,
    /// Initial state value.
    pub state: String,
}

impl Config {
    /// Load configuration from `roomsense.toml` (path override via
    /// `ROOMSENSE_CONFIG`) then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// daemon-level invariants fail.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("ROOMSENSE_CONFIG").unwrap_or_else(|_| "roomsense.toml".to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROOMSENSE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Room tables are checked by the engine at construction, where a bad
    /// room is skipped without taking the others down. Only invariants that
    /// span rooms or would panic the runtime are fatal here.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.walk_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "simulation.walk_interval_secs must be non-zero".to_string(),
            ));
        }
        let mut seen: std::collections::HashMap<String, &str> = std::collections::HashMap::new();
        for room in &self.room {
            if let Some(previous) = seen.insert(room.slug(), room.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "rooms {previous:?} and {:?} derive the same entity ids",
                    room.name
                )));
            }
        }
        Ok(())
    }

    /// Presence sensors across all configured rooms, deduplicated in
    /// configuration order, for the motion simulator.
    #[must_use]
    pub fn simulated_sensors(&self) -> Vec<EntityId> {
        let mut sensors: Vec<EntityId> = Vec::new();
        for room in &self.room {
            for sensor in &room.presence_sensors {
                if !sensors.contains(sensor) {
                    sensors.push(sensor.clone());
                }
            }
        }
        sensors
    }
}

impl SimulationConfig {
    /// Interval between simulated sensor flips.
    #[must_use]
    pub fn walk_interval(&self) -> Duration {
        Duration::from_secs(self.walk_interval_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "roomsensed=info,roomsense_app=info,roomsense_adapter_simulator=info"
                .to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            walk_interval_secs: 30,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
