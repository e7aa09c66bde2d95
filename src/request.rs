use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of an actor.
///
/// Audit events keep only this identifier, so removing an account never
/// invalidates its history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An authenticated user or service as seen by the identity layer.
///
/// Capabilities are named groupings (for example `"administrator"` or
/// `"staff"`); a privileged actor bypasses every capability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier for this actor
    pub id: ActorId,
    /// Login name, used in human-readable audit labels
    pub username: String,
    #[serde(default)]
    capabilities: BTreeSet<String>,
    #[serde(default)]
    privileged: bool,
}

impl Actor {
    /// Creates an actor with no capabilities.
    pub fn new(id: impl Into<ActorId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            capabilities: BTreeSet::new(),
            privileged: false,
        }
    }

    /// Adds a capability.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Marks the actor as privileged (superuser).
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Returns true if the actor holds the named capability.
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    /// Returns true if the actor is privileged.
    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Iterates the actor's capabilities in name order.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_are_queried_by_name() {
        let actor = Actor::new("u1", "alice").with_capability("staff");

        assert!(actor.has_capability("staff"));
        assert!(!actor.has_capability("administrator"));
        assert!(!actor.is_privileged());
        assert_eq!(actor.capabilities().collect::<Vec<_>>(), vec!["staff"]);
    }

    #[test]
    fn privileged_flag_is_explicit() {
        let root = Actor::new("u0", "root").privileged();
        assert!(root.is_privileged());
        assert_eq!(root.capabilities().count(), 0);
    }

    #[test]
    fn actor_id_serializes_as_plain_string() {
        let id = ActorId::new("u42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u42\"");
        assert_eq!(id.to_string(), "u42");
    }
}
