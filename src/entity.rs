//! The contract monitored entities implement.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::request::ActorId;

/// Field values of one entity keyed by field name.
pub type Snapshot = serde_json::Map<String, Value>;

/// Failure to turn an entity into a [`Snapshot`].
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Serialization itself failed.
    #[error("entity could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The entity serialized to something other than a map of fields.
    #[error("entity did not serialize to a field map")]
    NotAnObject,
}

/// A business record owned by one actor.
///
/// Implementors serialize to a flat map of fields; that map is what change
/// tracking compares before and after a write.
pub trait Entity: Serialize + Clone + Send + Sync + 'static {
    /// Name used in the registry and in audit events.
    const TYPE_NAME: &'static str;

    /// Persisted identity, `None` before the first write.
    fn id(&self) -> Option<&str>;

    /// Called by the store when it assigns an identity.
    fn set_id(&mut self, id: String);

    /// The responsible actor.
    fn owner(&self) -> Option<&ActorId>;

    /// Replaces the responsible actor. `None` clears it.
    fn set_owner(&mut self, owner: Option<ActorId>);

    /// Human-readable description, frozen into audit events.
    fn label(&self) -> String;

    /// Updates lifecycle timestamps. `created` is true on the first write.
    fn touch(&mut self, _now: DateTime<Utc>, _created: bool) {}
}

/// Object-safe view of an [`Entity`] used by lifecycle hooks.
pub trait Tracked {
    /// Monitored type name.
    fn type_name(&self) -> &'static str;

    /// Persisted identity, if any.
    fn target_id(&self) -> Option<&str>;

    /// Human-readable description.
    fn target_label(&self) -> String;

    /// Current field values.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the entity cannot be serialized.
    fn snapshot(&self) -> Result<Snapshot, SnapshotError>;
}

impl<E: Entity> Tracked for E {
    fn type_name(&self) -> &'static str {
        E::TYPE_NAME
    }

    fn target_id(&self) -> Option<&str> {
        self.id()
    }

    fn target_label(&self) -> String {
        self.label()
    }

    fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        snapshot_of(self)
    }
}

/// Serializes any value into a field map.
///
/// # Errors
///
/// Fails when serialization fails or the value is not a struct/map.
pub fn snapshot_of<T: Serialize + ?Sized>(value: &T) -> Result<Snapshot, SnapshotError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(SnapshotError::NotAnObject),
    }
}
