//! State-change events fanned out by the hub.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::state::EntityState;

/// Record of one entity state write: the previous and the new snapshot.
///
/// `old` is `None` the first time an entity appears; `new` is `None` when it
/// is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_id: EntityId,
    pub old: Option<EntityState>,
    pub new: Option<EntityState>,
}

impl StateChange {
    /// Whether the change landed on `"on"`, regardless of the previous state.
    ///
    /// Repeated `on` → `on` reports count: every `"on"` notification is
    /// treated as fresh presence.
    #[must_use]
    pub fn turned_on(&self) -> bool {
        self.new.as_ref().is_some_and(EntityState::is_on)
    }
}
