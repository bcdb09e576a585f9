//! # roomsense-adapter-memory
//!
//! In-process implementation of the hub port: an entity state store with
//! broadcast fan-out of every write, plus service semantics for the
//! switch-like domains (`turn_on`, `turn_off`, `toggle`).
//!
//! Stands in for a networked home-automation host in the daemon and in the
//! behavioural tests; every service call is journaled so tests can assert
//! exactly what was actuated, and how often.
//!
//! ## Dependency rule
//! Depends on `roomsense-app` (port traits) and `roomsense-domain` only.

use std::collections::HashMap;

use roomsense_app::ports::hub::{Hub, HubError};
use roomsense_domain::entity::EntityId;
use roomsense_domain::event::StateChange;
use roomsense_domain::service::ServiceCall;
use roomsense_domain::state::{Attributes, EntityState, STATE_OFF, STATE_ON};
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

/// State changes a slow subscriber may queue before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// In-process hub backed by a plain map.
pub struct MemoryHub {
    entities: Mutex<HashMap<EntityId, EntityState>>,
    calls: Mutex<Vec<ServiceCall>>,
    events: broadcast::Sender<StateChange>,
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHub {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            entities: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Every service call received so far, oldest first.
    pub async fn service_calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().await.clone()
    }

    async fn write(&self, entity_id: &EntityId, state: &str, attributes: Attributes) -> StateChange {
        let new = EntityState::with_attributes(state, attributes);
        let old = self
            .entities
            .lock()
            .await
            .insert(entity_id.clone(), new.clone());
        StateChange {
            entity_id: entity_id.clone(),
            old,
            new: Some(new),
        }
    }

    fn fan_out(&self, change: StateChange) {
        // A send error only means nobody is subscribed yet.
        let _ = self.events.send(change);
    }
}

impl Hub for MemoryHub {
    async fn get_state(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.entities.lock().await.get(entity_id).cloned()
    }

    async fn set_state(
        &self,
        entity_id: &EntityId,
        state: &str,
        attributes: Attributes,
    ) -> Result<(), HubError> {
        let change = self.write(entity_id, state, attributes).await;
        self.fan_out(change);
        Ok(())
    }

    async fn call_service(&self, call: ServiceCall) -> Result<(), HubError> {
        self.calls.lock().await.push(call.clone());
        match call.service.as_str() {
            "turn_on" | "turn_off" | "toggle" => {
                let Some(target) = call.target() else {
                    return Err(HubError::InvalidPayload(format!(
                        "{}.{} without an entity_id",
                        call.domain, call.service
                    )));
                };
                let current = self.entities.lock().await.get(&target).cloned();
                let next = match call.service.as_str() {
                    "turn_on" => STATE_ON,
                    "turn_off" => STATE_OFF,
                    _ if current.as_ref().is_some_and(EntityState::is_on) => STATE_OFF,
                    _ => STATE_ON,
                };
                // Actuation flips the state; attributes survive it.
                let attributes = current.map(|s| s.attributes).unwrap_or_default();
                let change = self.write(&target, next, attributes).await;
                self.fan_out(change);
                Ok(())
            }
            _ => {
                debug!(
                    domain = %call.domain,
                    service = %call.service,
                    "service journaled without effect"
                );
                Ok(())
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    async fn known_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
