//! Host-shaped entity identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of an entity on the home-automation host, `domain.object_id`.
///
/// Both halves are non-empty and limited to `[a-z0-9_]`, e.g.
/// `binary_sensor.kitchen_motion`. Serialized as the plain string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

/// Error returned when a string is not a valid entity id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid entity id {raw:?}: {reason}")]
pub struct EntityIdError {
    pub raw: String,
    pub reason: &'static str,
}

impl EntityId {
    /// Parse and validate an entity id.
    ///
    /// # Errors
    ///
    /// Returns [`EntityIdError`] when the separator is missing or either half
    /// is empty or contains characters outside `[a-z0-9_]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, EntityIdError> {
        let raw = raw.into();
        match Self::check(&raw) {
            None => Ok(Self(raw)),
            Some(reason) => Err(EntityIdError { raw, reason }),
        }
    }

    fn check(raw: &str) -> Option<&'static str> {
        let Some((domain, object_id)) = raw.split_once('.') else {
            return Some("missing `.` separator");
        };
        if domain.is_empty() || object_id.is_empty() {
            return Some("empty domain or object id");
        }
        if object_id.contains('.') {
            return Some("more than one `.` separator");
        }
        let part_ok = |part: &str| {
            part.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        };
        if !part_ok(domain) || !part_ok(object_id) {
            return Some("characters outside [a-z0-9_]");
        }
        None
    }

    /// The part before the separator, e.g. `binary_sensor`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map_or("", |(domain, _)| domain)
    }

    /// The part after the separator, e.g. `kitchen_motion`.
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.0.split_once('.').map_or("", |(_, object_id)| object_id)
    }

    /// The full `domain.object_id` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
