//! Per-room presence engine.
//!
//! One `RoomPresence` task per configured room. The task owns the room state,
//! a single replaceable expiry deadline, and a watchdog interval; everything
//! is dispatched serially from one `select!` loop, so handlers never overlap
//! and the engine needs no locks.

use std::collections::HashSet;
use std::time::Duration;

use roomsense_domain::entity::{EntityId, EntityIdError};
use roomsense_domain::event::StateChange;
use roomsense_domain::room::{RoomConfig, RoomState, ValidationError};
use roomsense_domain::service::ServiceCall;
use roomsense_domain::state::{Attributes, STATE_OFF, STATE_ON};
use roomsense_domain::time;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::evaluator::RoomEvaluator;
use crate::ports::hub::Hub;

/// Period of the sweep that adopts devices switched on behind the engine's
/// back. Bounds the unattended-device window without approaching the
/// granularity of the occupancy timeouts.
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(60);

/// Error building a [`RoomPresence`] engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid room configuration: {0}")]
    Config(#[from] ValidationError),
    #[error("invalid derived entity id: {0}")]
    DerivedId(#[from] EntityIdError),
}

/// Presence-driven controller for a single room.
///
/// Consumed by [`run`](Self::run); all interaction with a running engine goes
/// through the hub (presence sensors in, room state and service calls out).
pub struct RoomPresence<H> {
    hub: H,
    config: RoomConfig,
    state_entity: EntityId,
    switch_entity: EntityId,
    state: RoomState,
    deadline: Option<Instant>,
    expiry_label: Option<String>,
}

impl<H: Hub + Send + Sync> RoomPresence<H> {
    /// Build the engine for one room.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the configuration is structurally
    /// invalid. Unknown entity ids are not an error; they are reported once
    /// at startup.
    pub fn new(hub: H, config: RoomConfig) -> Result<Self, EngineError> {
        config.validate()?;
        // Fixed for the life of the room; computed once, never re-derived.
        let state_entity = config.presence_state_entity()?;
        let switch_entity = config.enabled_switch_entity()?;
        Ok(Self {
            hub,
            config,
            state_entity,
            switch_entity,
            state: RoomState::Idle,
            deadline: None,
            expiry_label: None,
        })
    }

    /// Run the room until the hub's state-change stream closes.
    ///
    /// Every failure past construction is logged and tolerated: a room keeps
    /// running with whatever the hub still gives it.
    pub async fn run(mut self) {
        let mut changes = self.hub.subscribe();
        self.initialize().await;

        let mut watchdog = tokio::time::interval(WATCHDOG_INTERVAL);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first interval tick completes immediately; consume it so the
        // first sweep happens a full period after startup.
        watchdog.tick().await;

        loop {
            let deadline = self.deadline;
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(change) => self.on_state_change(&change).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(room = %self.config.name, missed, "state-change stream lagged");
                    }
                    Err(RecvError::Closed) => {
                        info!(room = %self.config.name, "state-change stream closed, stopping room");
                        break;
                    }
                },
                () = wait_for(deadline) => self.on_timer_expiry().await,
                _ = watchdog.tick() => self.on_watchdog_tick().await,
            }
        }
    }

    async fn initialize(&mut self) {
        info!(
            room = %self.config.name,
            presence_sensors = self.config.presence_sensors.len(),
            control_entities = self.config.control_entities.len(),
            night_control_entities = self.config.night_control_entities.len(),
            timeout_secs = self.config.timeout_secs,
            night_timeout_secs = self.config.night_timeout_secs,
            state_entity = %self.state_entity,
            "room presence engine starting"
        );
        self.report_unknown_entities().await;
        if self.ensure_enabled().await {
            self.publish(RoomState::Idle).await;
        }
    }

    /// Unknown ids are worth a warning, never a failure: entities can appear
    /// later when their integration comes up.
    async fn report_unknown_entities(&self) {
        let known: HashSet<EntityId> = self.hub.known_entities().await.into_iter().collect();
        let missing: Vec<String> = self
            .config
            .referenced_entities()
            .into_iter()
            .filter(|id| !known.contains(id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            warn!(
                room = %self.config.name,
                entities = %missing.join(", "),
                "configured entities unknown to the hub"
            );
        }
    }

    async fn on_state_change(&mut self, change: &StateChange) {
        if !self.config.presence_sensors.contains(&change.entity_id) {
            return;
        }
        // Deliberately broad: every change landing on "on" counts as fresh
        // presence, including repeated on → on reports.
        if !change.turned_on() {
            return;
        }
        debug!(room = %self.config.name, sensor = %change.entity_id, "presence reported");
        self.handle_presence().await;
    }

    async fn handle_presence(&mut self) {
        if !self.ensure_enabled().await {
            return;
        }
        if !self.evaluator().lux_below_limit().await {
            debug!(room = %self.config.name, "ambient light above limit, presence ignored");
            return;
        }
        self.turn_on_control_entities().await;
        let timeout = self.evaluator().current_timeout().await;
        self.arm(timeout);
        self.publish(RoomState::Active).await;
    }

    async fn on_timer_expiry(&mut self) {
        self.disarm();
        if !self.ensure_enabled().await {
            return;
        }
        let held_by = self.evaluator().active_entities().await;
        if !held_by.is_empty() {
            debug!(
                room = %self.config.name,
                sensors = held_by.len(),
                "occupancy window extended, sensors still on"
            );
            let timeout = self.evaluator().current_timeout().await;
            self.arm(timeout);
            self.publish(RoomState::Active).await;
            return;
        }
        debug!(room = %self.config.name, "occupancy window expired");
        self.turn_off_control_entities().await;
        self.publish(RoomState::Idle).await;
    }

    async fn on_watchdog_tick(&mut self) {
        if !self.ensure_enabled().await {
            return;
        }
        if self.state != RoomState::Idle {
            return;
        }
        // Keep-alive sensors hold the room as much as presence does; adoption
        // is only for devices on while nothing at all reports occupancy.
        if !self.evaluator().active_entities().await.is_empty() {
            return;
        }
        let stray = self.evaluator().lit_devices().await;
        if stray.is_empty() {
            return;
        }
        info!(
            room = %self.config.name,
            devices = %join(&stray),
            "devices on without presence, adopting until timeout"
        );
        let timeout = self.evaluator().current_timeout().await;
        self.arm(timeout);
        self.publish(RoomState::Override).await;
    }

    /// Evaluate the per-room enable switch. Returns false when the room is
    /// disabled; the engine then leaves every device exactly as it is.
    async fn ensure_enabled(&mut self) -> bool {
        match self.hub.get_state(&self.switch_entity).await {
            Some(snapshot) if snapshot.state == STATE_OFF => {
                self.disarm();
                if self.state != RoomState::Disabled {
                    info!(room = %self.config.name, "room disabled by switch");
                    self.publish(RoomState::Disabled).await;
                }
                false
            }
            Some(_) => {
                self.recover_if_disabled().await;
                true
            }
            None => {
                // First run against a fresh hub: expose the switch, enabled.
                if let Err(error) = self
                    .hub
                    .set_state(&self.switch_entity, STATE_ON, Attributes::new())
                    .await
                {
                    warn!(room = %self.config.name, %error, "failed to initialise enable switch");
                }
                self.recover_if_disabled().await;
                true
            }
        }
    }

    async fn recover_if_disabled(&mut self) {
        if self.state == RoomState::Disabled {
            info!(room = %self.config.name, "room re-enabled");
            self.publish(RoomState::Idle).await;
        }
    }

    async fn turn_on_control_entities(&self) {
        for id in self.evaluator().control_entities(self.state).await {
            let already_on = self
                .hub
                .get_state(&id)
                .await
                .is_some_and(|snapshot| snapshot.is_on());
            if already_on {
                continue;
            }
            if let Err(error) = self.hub.call_service(ServiceCall::turn_on(&id)).await {
                warn!(room = %self.config.name, entity = %id, %error, "turn_on failed");
            }
        }
    }

    async fn turn_off_control_entities(&self) {
        for id in self.evaluator().control_entities(self.state).await {
            if let Err(error) = self.hub.call_service(ServiceCall::turn_off(&id)).await {
                warn!(room = %self.config.name, entity = %id, %error, "turn_off failed");
            }
        }
    }

    /// Arm the expiry timer, replacing any armed deadline. The dispatch loop
    /// rebuilds its sleep future from this slot on every turn, so replacing
    /// the deadline is cancellation.
    fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
        self.expiry_label = Some(time::expiry_label(timeout));
    }

    fn disarm(&mut self) {
        self.deadline = None;
        self.expiry_label = None;
    }

    /// Publish the room state with its diagnostic attributes. The engine is
    /// the only writer of its state entity, so publishes are strictly ordered.
    async fn publish(&mut self, state: RoomState) {
        self.state = state;
        let attributes = self.state_attributes(state).await;
        if let Err(error) = self
            .hub
            .set_state(&self.state_entity, state.as_str(), attributes)
            .await
        {
            warn!(room = %self.config.name, %error, "failed to publish room state");
        }
    }

    async fn state_attributes(&self, state: RoomState) -> Attributes {
        let evaluator = self.evaluator();
        let mut attributes = Attributes::new();
        attributes.insert(
            "presence_sensors".into(),
            json!(self.config.presence_sensors),
        );
        attributes.insert(
            "keep_alive_sensors".into(),
            json!(self.config.keep_alive_sensors),
        );
        attributes.insert(
            "control_entities".into(),
            json!(self.config.control_entities),
        );
        attributes.insert(
            "night_control_entities".into(),
            json!(self.config.night_control_entities),
        );
        match state {
            RoomState::Idle | RoomState::Disabled => {
                attributes.insert("lux".into(), json!(evaluator.lux_reading().await));
                attributes.insert("lux_limit".into(), json!(evaluator.lux_limit().await));
            }
            RoomState::Active | RoomState::Override => {
                attributes.insert(
                    "active_entities".into(),
                    json!(evaluator.active_entities().await),
                );
                if let Some(expiry) = &self.expiry_label {
                    attributes.insert("expiry".into(), json!(expiry));
                }
            }
        }
        attributes
    }

    fn evaluator(&self) -> RoomEvaluator<'_, H> {
        RoomEvaluator::new(&self.config, &self.hub)
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn join(ids: &[EntityId]) -> String {
    ids.iter()
        .map(EntityId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use roomsense_adapter_memory::MemoryHub;

    use super::*;

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    #[test]
    fn should_reject_structurally_invalid_config() {
        let config = RoomConfig::builder("Hall").build();
        assert!(config.is_err());

        let config = RoomConfig {
            timeout_secs: 0,
            ..RoomConfig::builder("Hall")
                .presence_sensor(id("binary_sensor.hall_motion"))
                .control_entity(id("light.hall"))
                .build()
                .unwrap()
        };
        let result = RoomPresence::new(MemoryHub::new(), config);
        assert!(matches!(
            result,
            Err(EngineError::Config(ValidationError::ZeroTimeout(_)))
        ));
    }

    #[test]
    fn should_derive_published_entities_from_the_room_name() {
        let config = RoomConfig::builder("Guest Room")
            .presence_sensor(id("binary_sensor.guest_motion"))
            .control_entity(id("light.guest"))
            .build()
            .unwrap();
        let engine = RoomPresence::new(MemoryHub::new(), config).unwrap();
        assert_eq!(
            engine.state_entity.as_str(),
            "sensor.room_presence_guest_room"
        );
        assert_eq!(
            engine.switch_entity.as_str(),
            "switch.room_presence_enabled_guest_room"
        );
    }

    #[test]
    fn should_replace_the_deadline_when_armed_twice() {
        let config = RoomConfig::builder("Hall")
            .presence_sensor(id("binary_sensor.hall_motion"))
            .control_entity(id("light.hall"))
            .build()
            .unwrap();
        let mut engine = RoomPresence::new(MemoryHub::new(), config).unwrap();

        engine.arm(Duration::from_secs(300));
        let first = engine.deadline.unwrap();
        engine.arm(Duration::from_secs(600));
        let second = engine.deadline.unwrap();

        assert!(second > first);
        engine.disarm();
        assert!(engine.deadline.is_none());
        assert!(engine.expiry_label.is_none());
    }
}
