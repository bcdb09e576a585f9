//! Room configuration and the published room occupancy state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityIdError};
use crate::state::STATE_ON;

/// Lux ceiling applied when neither a static nor a dynamic limit is set.
pub const DEFAULT_LUX_LIMIT: u32 = 40;
/// Inactivity timeout applied in day mode when none is configured, seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// Inactivity timeout applied in night mode when none is configured, seconds.
pub const DEFAULT_NIGHT_TIMEOUT_SECS: u64 = 60;

/// Occupancy state of one room, published to the hub as the state of the
/// room's derived `sensor.room_presence_*` entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    /// Nobody present; the engine believes the controlled devices are off.
    #[default]
    Idle,
    /// Presence seen recently; devices on, expiry timer armed.
    Active,
    /// The per-room enable switch is off; the engine does not act at all.
    Disabled,
    /// Devices found on without presence; the engine adopted them and armed
    /// an expiry to turn them off.
    Override,
}

impl RoomState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Override => "override",
        }
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural problem in a [`RoomConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("room name is empty")]
    EmptyName,
    #[error("room name {0:?} produces no usable entity id slug")]
    UnusableName(String),
    #[error("room {0:?} has no presence sensors")]
    NoPresenceSensors(String),
    #[error("room {0:?} has no control entities")]
    NoControlEntities(String),
    #[error("room {0:?} has a zero timeout")]
    ZeroTimeout(String),
}

/// Static configuration of one controlled room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Human room name; its slug derives the published entity ids.
    pub name: String,
    /// Motion or occupancy sensors that start and refresh the occupancy window.
    pub presence_sensors: Vec<EntityId>,
    /// Sensors that extend a running window at expiry but never start one.
    #[serde(default)]
    pub keep_alive_sensors: Vec<EntityId>,
    /// Devices switched in day mode.
    pub control_entities: Vec<EntityId>,
    /// Devices switched in night mode instead; empty means no day/night split.
    #[serde(default)]
    pub night_control_entities: Vec<EntityId>,
    /// Ambient light sensor; absent means the room always counts as dark.
    #[serde(default)]
    pub lux_sensor: Option<EntityId>,
    /// Static lux ceiling; presence only switches devices on at or below it.
    #[serde(default)]
    pub lux_limit: Option<u32>,
    /// Entity whose state, parsed as an integer, overrides `lux_limit`.
    #[serde(default)]
    pub lux_limit_entity: Option<EntityId>,
    /// Entity whose state selects night mode.
    #[serde(default)]
    pub night_time_entity: Option<EntityId>,
    /// States of `night_time_entity` that count as night.
    #[serde(default = "default_night_states")]
    pub night_states: Vec<String>,
    /// Inactivity timeout in day mode, seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Inactivity timeout in night mode, seconds.
    #[serde(default = "default_night_timeout_secs")]
    pub night_timeout_secs: u64,
}

fn default_night_states() -> Vec<String> {
    vec![STATE_ON.to_string()]
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_night_timeout_secs() -> u64 {
    DEFAULT_NIGHT_TIMEOUT_SECS
}

impl RoomConfig {
    /// Create a builder for constructing a [`RoomConfig`].
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RoomConfigBuilder {
        RoomConfigBuilder::new(name)
    }

    /// Check structural invariants.
    ///
    /// Unknown entity ids are deliberately not checked here; whether an id
    /// exists on the hub is a runtime question and only worth a warning.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.slug().is_empty() {
            return Err(ValidationError::UnusableName(self.name.clone()));
        }
        if self.presence_sensors.is_empty() {
            return Err(ValidationError::NoPresenceSensors(self.name.clone()));
        }
        if self.control_entities.is_empty() {
            return Err(ValidationError::NoControlEntities(self.name.clone()));
        }
        if self.timeout_secs == 0 || self.night_timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout(self.name.clone()));
        }
        Ok(())
    }

    /// Lowercased name with runs of anything outside `[a-z0-9]` collapsed to
    /// a single `_`, e.g. `"Living Room"` → `"living_room"`.
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for ch in self.name.chars() {
            let ch = ch.to_ascii_lowercase();
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                slug.push(ch);
            } else if !slug.is_empty() && !slug.ends_with('_') {
                slug.push('_');
            }
        }
        slug.trim_end_matches('_').to_string()
    }

    /// Entity the engine publishes the room state to.
    ///
    /// # Errors
    ///
    /// Returns [`EntityIdError`] when the name slugifies to something the id
    /// grammar rejects; [`validate`](Self::validate) catches this earlier.
    pub fn presence_state_entity(&self) -> Result<EntityId, EntityIdError> {
        EntityId::new(format!("sensor.room_presence_{}", self.slug()))
    }

    /// Per-room enable switch; `"off"` suspends the engine for this room.
    ///
    /// # Errors
    ///
    /// Returns [`EntityIdError`] when the name slugifies to something the id
    /// grammar rejects.
    pub fn enabled_switch_entity(&self) -> Result<EntityId, EntityIdError> {
        EntityId::new(format!("switch.room_presence_enabled_{}", self.slug()))
    }

    /// Day-mode inactivity timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Night-mode inactivity timeout.
    #[must_use]
    pub fn night_timeout(&self) -> Duration {
        Duration::from_secs(self.night_timeout_secs)
    }

    /// Whether a separate night device set is configured.
    #[must_use]
    pub fn has_night_split(&self) -> bool {
        !self.night_control_entities.is_empty()
    }

    /// Every entity id referenced by this room, deduplicated and sorted.
    #[must_use]
    pub fn referenced_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .presence_sensors
            .iter()
            .chain(&self.keep_alive_sensors)
            .chain(&self.control_entities)
            .chain(&self.night_control_entities)
            .chain(&self.lux_sensor)
            .chain(&self.lux_limit_entity)
            .chain(&self.night_time_entity)
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Step-by-step builder for [`RoomConfig`].
#[derive(Debug)]
pub struct RoomConfigBuilder {
    config: RoomConfig,
}

impl RoomConfigBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: RoomConfig {
                name: name.into(),
                presence_sensors: Vec::new(),
                keep_alive_sensors: Vec::new(),
                control_entities: Vec::new(),
                night_control_entities: Vec::new(),
                lux_sensor: None,
                lux_limit: None,
                lux_limit_entity: None,
                night_time_entity: None,
                night_states: default_night_states(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                night_timeout_secs: DEFAULT_NIGHT_TIMEOUT_SECS,
            },
        }
    }

    #[must_use]
    pub fn presence_sensor(mut self, id: EntityId) -> Self {
        self.config.presence_sensors.push(id);
        self
    }

    #[must_use]
    pub fn keep_alive_sensor(mut self, id: EntityId) -> Self {
        self.config.keep_alive_sensors.push(id);
        self
    }

    #[must_use]
    pub fn control_entity(mut self, id: EntityId) -> Self {
        self.config.control_entities.push(id);
        self
    }

    #[must_use]
    pub fn night_control_entity(mut self, id: EntityId) -> Self {
        self.config.night_control_entities.push(id);
        self
    }

    #[must_use]
    pub fn lux_sensor(mut self, id: EntityId) -> Self {
        self.config.lux_sensor = Some(id);
        self
    }

    #[must_use]
    pub fn lux_limit(mut self, limit: u32) -> Self {
        self.config.lux_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn lux_limit_entity(mut self, id: EntityId) -> Self {
        self.config.lux_limit_entity = Some(id);
        self
    }

    #[must_use]
    pub fn night_time_entity(mut self, id: EntityId) -> Self {
        self.config.night_time_entity = Some(id);
        self
    }

    /// Replace the night state set (the default is just `"on"`).
    #[must_use]
    pub fn night_states(mut self, states: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.night_states = states.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn night_timeout_secs(mut self, secs: u64) -> Self {
        self.config.night_timeout_secs = secs;
        self
    }

    /// Consume the builder, validate, and return a [`RoomConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if required fields are missing or empty.
    pub fn build(self) -> Result<RoomConfig, ValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn minimal() -> RoomConfigBuilder {
        RoomConfig::builder("Living Room")
            .presence_sensor(id("binary_sensor.living_motion"))
            .control_entity(id("light.living_main"))
    }

    #[test]
    fn should_build_minimal_config_with_defaults() {
        let config = minimal().build().unwrap();
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.night_timeout_secs, 60);
        assert_eq!(config.night_states, vec!["on".to_string()]);
        assert!(config.keep_alive_sensors.is_empty());
        assert!(!config.has_night_split());
    }

    #[test]
    fn should_slugify_name_for_derived_entities() {
        let config = minimal().build().unwrap();
        assert_eq!(config.slug(), "living_room");
        assert_eq!(
            config.presence_state_entity().unwrap().as_str(),
            "sensor.room_presence_living_room"
        );
        assert_eq!(
            config.enabled_switch_entity().unwrap().as_str(),
            "switch.room_presence_enabled_living_room"
        );
    }

    #[test]
    fn should_collapse_symbol_runs_in_slug() {
        let config = RoomConfig::builder("Kid's  Room #2")
            .presence_sensor(id("binary_sensor.kids_motion"))
            .control_entity(id("light.kids_main"))
            .build()
            .unwrap();
        assert_eq!(config.slug(), "kid_s_room_2");
    }

    #[test]
    fn should_reject_empty_name() {
        let err = RoomConfig::builder("  ")
            .presence_sensor(id("binary_sensor.x_motion"))
            .control_entity(id("light.x_main"))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyName);
    }

    #[test]
    fn should_reject_name_without_usable_slug() {
        let err = RoomConfig::builder("##")
            .presence_sensor(id("binary_sensor.x_motion"))
            .control_entity(id("light.x_main"))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::UnusableName("##".to_string()));
    }

    #[test]
    fn should_reject_missing_presence_sensors() {
        let err = RoomConfig::builder("Hall")
            .control_entity(id("light.hall"))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::NoPresenceSensors("Hall".to_string()));
    }

    #[test]
    fn should_reject_missing_control_entities() {
        let err = RoomConfig::builder("Hall")
            .presence_sensor(id("binary_sensor.hall_motion"))
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::NoControlEntities("Hall".to_string()));
    }

    #[test]
    fn should_reject_zero_timeouts() {
        let err = minimal().timeout_secs(0).build().unwrap_err();
        assert_eq!(err, ValidationError::ZeroTimeout("Living Room".to_string()));
    }

    #[test]
    fn should_collect_referenced_entities_deduplicated() {
        let config = minimal()
            .keep_alive_sensor(id("media_player.living_tv"))
            .night_control_entity(id("light.living_main"))
            .lux_sensor(id("sensor.living_lux"))
            .build()
            .unwrap();
        let ids = config.referenced_entities();
        assert_eq!(
            ids,
            vec![
                id("binary_sensor.living_motion"),
                id("light.living_main"),
                id("media_player.living_tv"),
                id("sensor.living_lux"),
            ]
        );
    }

    #[test]
    fn should_deserialize_from_toml_with_defaults() {
        let config: RoomConfig = toml::from_str(
            r#"
            name = "Bedroom"
            presence_sensors = ["binary_sensor.bedroom_motion"]
            control_entities = ["light.bedroom_main"]
            night_control_entities = ["light.bedroom_dim"]
            night_time_entity = "input_select.house_mode"
            night_states = ["sleeping", "night"]
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "Bedroom");
        assert_eq!(config.timeout_secs, 300);
        assert!(config.has_night_split());
        assert_eq!(config.night_states, vec!["sleeping", "night"]);
    }

    #[test]
    fn should_display_room_states_lowercase() {
        assert_eq!(RoomState::Idle.to_string(), "idle");
        assert_eq!(RoomState::Active.to_string(), "active");
        assert_eq!(RoomState::Disabled.to_string(), "disabled");
        assert_eq!(RoomState::Override.to_string(), "override");
    }

    #[test]
    fn should_serialize_room_states_lowercase() {
        assert_eq!(
            serde_json::to_string(&RoomState::Override).unwrap(),
            "\"override\""
        );
    }
}
