//! Service calls — commands sent to the host to actuate devices.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entity::EntityId;

/// A command for the home-automation host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    /// Service domain, e.g. `light` or `switch`.
    pub domain: String,
    /// Service name within the domain, e.g. `turn_on`.
    pub service: String,
    /// Service payload; calls targeting an entity carry an `entity_id` member.
    pub data: serde_json::Value,
}

impl ServiceCall {
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            data,
        }
    }

    /// `turn_on` addressed to the entity through its own domain.
    #[must_use]
    pub fn turn_on(entity_id: &EntityId) -> Self {
        Self::new(entity_id.domain(), "turn_on", json!({ "entity_id": entity_id }))
    }

    /// `turn_off` addressed to the entity through its own domain.
    #[must_use]
    pub fn turn_off(entity_id: &EntityId) -> Self {
        Self::new(entity_id.domain(), "turn_off", json!({ "entity_id": entity_id }))
    }

    /// The `entity_id` member of the payload, when present and well-formed.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.data.get("entity_id")?.as_str()?.parse().ok()
    }
}
