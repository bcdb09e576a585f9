//! Entity state snapshots and attribute bags.

use serde::{Deserialize, Serialize};

use crate::time::{self, Timestamp};

/// Attribute bag attached to an entity state.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// State string reported by binary sensors, switches, and lights when set.
pub const STATE_ON: &str = "on";
/// State string reported when cleared.
pub const STATE_OFF: &str = "off";

/// Point-in-time snapshot of one entity as known by the hub.
///
/// States are free-form strings on the host side (`"on"`, `"off"`,
/// `"sleeping"`, `"17.5"`, ...); typed views are provided as helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub last_changed: Timestamp,
}

impl EntityState {
    /// Snapshot with the given state, empty attributes, `last_changed` now.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self::with_attributes(state, Attributes::new())
    }

    /// Snapshot with the given state and attributes, `last_changed` now.
    #[must_use]
    pub fn with_attributes(state: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            state: state.into(),
            attributes,
            last_changed: time::now(),
        }
    }

    /// Whether the state is exactly [`STATE_ON`].
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state == STATE_ON
    }

    /// The state parsed as a number, `None` for non-numeric states such as
    /// `"unavailable"`.
    #[must_use]
    pub fn numeric(&self) -> Option<f64> {
        self.state.trim().parse().ok()
    }
}
