//! Read-side queries over the hub snapshot for one room.

use std::time::Duration;

use roomsense_domain::entity::EntityId;
use roomsense_domain::room::{DEFAULT_LUX_LIMIT, RoomConfig, RoomState};
use roomsense_domain::state::EntityState;

use crate::ports::hub::Hub;

/// Evaluates presence, ambient light, and day/night mode against the current
/// hub state.
///
/// A thin borrowed view with no state of its own; construct one per decision
/// so every query sees the freshest snapshots.
pub struct RoomEvaluator<'a, H> {
    config: &'a RoomConfig,
    hub: &'a H,
}

impl<'a, H: Hub> RoomEvaluator<'a, H> {
    pub fn new(config: &'a RoomConfig, hub: &'a H) -> Self {
        Self { config, hub }
    }

    /// Presence and keep-alive sensors currently reporting `"on"`.
    pub async fn active_entities(&self) -> Vec<EntityId> {
        let mut active = Vec::new();
        for id in self
            .config
            .presence_sensors
            .iter()
            .chain(&self.config.keep_alive_sensors)
        {
            if self.is_on(id).await {
                active.push(id.clone());
            }
        }
        active
    }

    /// Whether the configured night entity currently reports a night state.
    pub async fn is_night_time(&self) -> bool {
        let Some(entity) = &self.config.night_time_entity else {
            return false;
        };
        match self.hub.get_state(entity).await {
            Some(snapshot) => self.config.night_states.contains(&snapshot.state),
            None => false,
        }
    }

    /// Inactivity timeout for the current mode.
    pub async fn current_timeout(&self) -> Duration {
        if self.is_night_time().await {
            self.config.night_timeout()
        } else {
            self.config.timeout()
        }
    }

    /// Effective lux ceiling.
    ///
    /// A configured limit entity overrides the static value; when its state
    /// is missing or unparsable the ceiling falls open to `u32::MAX` so a
    /// broken limit sensor never leaves a room dark.
    pub async fn lux_limit(&self) -> u32 {
        let Some(entity) = &self.config.lux_limit_entity else {
            return self.config.lux_limit.unwrap_or(DEFAULT_LUX_LIMIT);
        };
        match self.hub.get_state(entity).await {
            Some(snapshot) => snapshot.state.trim().parse().unwrap_or(u32::MAX),
            None => u32::MAX,
        }
    }

    /// Current ambient reading, 0 when the sensor is absent or unreadable.
    pub async fn lux_reading(&self) -> f64 {
        let Some(sensor) = &self.config.lux_sensor else {
            return 0.0;
        };
        match self.hub.get_state(sensor).await {
            Some(snapshot) => snapshot.numeric().unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Whether the room counts as dark enough to switch devices on.
    ///
    /// No lux sensor means always dark enough.
    pub async fn lux_below_limit(&self) -> bool {
        if self.config.lux_sensor.is_none() {
            return true;
        }
        self.lux_reading().await <= f64::from(self.lux_limit().await)
    }

    /// Device set the engine manipulates in the given room state.
    ///
    /// `Override` covers day and night devices alike since an adopted device
    /// may belong to either set; otherwise the current mode picks the set.
    pub async fn control_entities(&self, state: RoomState) -> Vec<EntityId> {
        if state == RoomState::Override {
            return self.control_union();
        }
        if self.config.has_night_split() && self.is_night_time().await {
            self.config.night_control_entities.clone()
        } else {
            self.config.control_entities.clone()
        }
    }

    /// Day and night devices currently reporting `"on"`.
    pub async fn lit_devices(&self) -> Vec<EntityId> {
        let mut lit = Vec::new();
        for id in self.control_union() {
            if self.is_on(&id).await {
                lit.push(id);
            }
        }
        lit
    }

    fn control_union(&self) -> Vec<EntityId> {
        let mut union = self.config.control_entities.clone();
        for id in &self.config.night_control_entities {
            if !union.contains(id) {
                union.push(id.clone());
            }
        }
        union
    }

    async fn is_on(&self, id: &EntityId) -> bool {
        self.hub
            .get_state(id)
            .await
            .as_ref()
            .is_some_and(EntityState::is_on)
    }
}

#[cfg(test)]
mod tests {
    use roomsense_adapter_memory::MemoryHub;
    use roomsense_domain::state::Attributes;

    use super::*;

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn config() -> RoomConfig {
        RoomConfig::builder("Study")
            .presence_sensor(id("binary_sensor.study_motion"))
            .keep_alive_sensor(id("media_player.study_tv"))
            .control_entity(id("light.study_main"))
            .night_control_entity(id("light.study_dim"))
            .lux_sensor(id("sensor.study_lux"))
            .lux_limit(30)
            .night_time_entity(id("input_select.house_mode"))
            .night_states(["sleeping", "night"])
            .build()
            .unwrap()
    }

    async fn set(hub: &MemoryHub, raw: &str, state: &str) {
        hub.set_state(&id(raw), state, Attributes::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_collect_active_presence_and_keep_alive_sensors() {
        let hub = MemoryHub::new();
        set(&hub, "binary_sensor.study_motion", "on").await;
        set(&hub, "media_player.study_tv", "on").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        let active = evaluator.active_entities().await;

        assert_eq!(
            active,
            vec![id("binary_sensor.study_motion"), id("media_player.study_tv")]
        );
    }

    #[tokio::test]
    async fn should_count_a_keep_alive_sensor_alone_as_active() {
        let hub = MemoryHub::new();
        set(&hub, "media_player.study_tv", "on").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(
            evaluator.active_entities().await,
            vec![id("media_player.study_tv")]
        );
    }

    #[tokio::test]
    async fn should_report_day_when_night_entity_is_missing() {
        let hub = MemoryHub::new();
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert!(!evaluator.is_night_time().await);
        assert_eq!(evaluator.current_timeout().await, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn should_report_night_when_state_matches_configured_set() {
        let hub = MemoryHub::new();
        set(&hub, "input_select.house_mode", "sleeping").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert!(evaluator.is_night_time().await);
        assert_eq!(evaluator.current_timeout().await, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn should_not_report_night_for_states_outside_the_set() {
        let hub = MemoryHub::new();
        set(&hub, "input_select.house_mode", "home").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert!(!evaluator.is_night_time().await);
    }

    #[tokio::test]
    async fn should_use_static_limit_without_limit_entity() {
        let hub = MemoryHub::new();
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(evaluator.lux_limit().await, 30);
    }

    #[tokio::test]
    async fn should_use_default_limit_without_any_configuration() {
        let hub = MemoryHub::new();
        let config = RoomConfig::builder("Hall")
            .presence_sensor(id("binary_sensor.hall_motion"))
            .control_entity(id("light.hall"))
            .build()
            .unwrap();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(evaluator.lux_limit().await, DEFAULT_LUX_LIMIT);
    }

    #[tokio::test]
    async fn should_prefer_limit_entity_over_static_limit() {
        let hub = MemoryHub::new();
        set(&hub, "input_number.study_lux_limit", "55").await;
        let mut config = config();
        config.lux_limit_entity = Some(id("input_number.study_lux_limit"));
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(evaluator.lux_limit().await, 55);
    }

    #[tokio::test]
    async fn should_fail_open_when_limit_entity_is_unreadable() {
        let hub = MemoryHub::new();
        set(&hub, "input_number.study_lux_limit", "unavailable").await;
        set(&hub, "sensor.study_lux", "900").await;
        let mut config = config();
        config.lux_limit_entity = Some(id("input_number.study_lux_limit"));
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(evaluator.lux_limit().await, u32::MAX);
        assert!(evaluator.lux_below_limit().await);
    }

    #[tokio::test]
    async fn should_treat_missing_lux_sensor_as_dark() {
        let hub = MemoryHub::new();
        let config = RoomConfig::builder("Hall")
            .presence_sensor(id("binary_sensor.hall_motion"))
            .control_entity(id("light.hall"))
            .build()
            .unwrap();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert!(evaluator.lux_below_limit().await);
    }

    #[tokio::test]
    async fn should_treat_unreadable_reading_as_dark() {
        let hub = MemoryHub::new();
        set(&hub, "sensor.study_lux", "unavailable").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(evaluator.lux_reading().await, 0.0);
        assert!(evaluator.lux_below_limit().await);
    }

    #[tokio::test]
    async fn should_block_when_reading_is_above_the_limit() {
        let hub = MemoryHub::new();
        set(&hub, "sensor.study_lux", "31").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert!(!evaluator.lux_below_limit().await);
    }

    #[tokio::test]
    async fn should_allow_when_reading_equals_the_limit() {
        let hub = MemoryHub::new();
        set(&hub, "sensor.study_lux", "30").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert!(evaluator.lux_below_limit().await);
    }

    #[tokio::test]
    async fn should_pick_day_set_during_the_day() {
        let hub = MemoryHub::new();
        set(&hub, "input_select.house_mode", "home").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(
            evaluator.control_entities(RoomState::Idle).await,
            vec![id("light.study_main")]
        );
    }

    #[tokio::test]
    async fn should_pick_night_set_at_night() {
        let hub = MemoryHub::new();
        set(&hub, "input_select.house_mode", "night").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(
            evaluator.control_entities(RoomState::Active).await,
            vec![id("light.study_dim")]
        );
    }

    #[tokio::test]
    async fn should_pick_day_set_at_night_without_a_split() {
        let hub = MemoryHub::new();
        set(&hub, "input_select.house_mode", "night").await;
        let mut config = config();
        config.night_control_entities.clear();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(
            evaluator.control_entities(RoomState::Active).await,
            vec![id("light.study_main")]
        );
    }

    #[tokio::test]
    async fn should_cover_the_union_during_override() {
        let hub = MemoryHub::new();
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(
            evaluator.control_entities(RoomState::Override).await,
            vec![id("light.study_main"), id("light.study_dim")]
        );
    }

    #[tokio::test]
    async fn should_list_lit_devices_across_both_sets() {
        let hub = MemoryHub::new();
        set(&hub, "light.study_dim", "on").await;
        let config = config();
        let evaluator = RoomEvaluator::new(&config, &hub);

        assert_eq!(evaluator.lit_devices().await, vec![id("light.study_dim")]);
    }
}
