//! Hub port — the home-automation host surface the engine consumes.

use std::future::Future;

use roomsense_domain::entity::EntityId;
use roomsense_domain::event::StateChange;
use roomsense_domain::service::ServiceCall;
use roomsense_domain::state::{Attributes, EntityState};
use tokio::sync::broadcast;

/// Error surfaced by hub write operations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The backend rejected or failed to apply a write.
    #[error("hub backend error: {0}")]
    Backend(String),
    /// A service call was missing or carried a malformed target.
    #[error("invalid service payload: {0}")]
    InvalidPayload(String),
}

/// Gateway to the home-automation host: entity state reads and writes,
/// service calls, and the hub-wide state-change stream.
///
/// Reads have no error channel on purpose: an unknown entity and an
/// unreachable backend both come back as `None`, and the evaluator defaults
/// keep behaviour safe in either case. Adapters log their own transport
/// failures.
pub trait Hub {
    /// Current snapshot of an entity, `None` when the hub does not know it.
    fn get_state(&self, entity_id: &EntityId)
    -> impl Future<Output = Option<EntityState>> + Send;

    /// Write an entity state, fanning out a [`StateChange`] to subscribers.
    fn set_state(
        &self,
        entity_id: &EntityId,
        state: &str,
        attributes: Attributes,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Invoke a host service such as `light.turn_on`.
    fn call_service(&self, call: ServiceCall) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Subscribe to the state-change stream.
    fn subscribe(&self) -> broadcast::Receiver<StateChange>;

    /// Every entity id the hub currently holds a state for.
    fn known_entities(&self) -> impl Future<Output = Vec<EntityId>> + Send;
}

impl<T: Hub + Send + Sync> Hub for std::sync::Arc<T> {
    fn get_state(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Option<EntityState>> + Send {
        (**self).get_state(entity_id)
    }

    fn set_state(
        &self,
        entity_id: &EntityId,
        state: &str,
        attributes: Attributes,
    ) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).set_state(entity_id, state, attributes)
    }

    fn call_service(&self, call: ServiceCall) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).call_service(call)
    }

    fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        (**self).subscribe()
    }

    fn known_entities(&self) -> impl Future<Output = Vec<EntityId>> + Send {
        (**self).known_entities()
    }
}
