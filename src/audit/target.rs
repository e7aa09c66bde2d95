//! Polymorphic reference to a monitored record.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Type name plus optional id of the record an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    type_name: String,
    id: Option<String>,
}

impl TargetRef {
    /// Creates a reference.
    pub fn new(type_name: impl Into<String>, id: Option<impl Into<String>>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.map(Into::into),
        }
    }

    /// Returns the type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the id, if known.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}#{}", self.type_name, id),
            None => write!(f, "{}", self.type_name),
        }
    }
}

type Lookup<T> = Box<dyn Fn(&str) -> Option<T> + Send + Sync>;

/// Explicit map from type name to a lookup function.
///
/// Resolution yields `None` for unknown types, references without an id and
/// records that no longer exist.
///
/// # Example
///
/// ```
/// use audit_scope::audit::{TargetRef, TargetResolver};
///
/// let resolver = TargetResolver::new()
///     .register("Person", |id| (id == "1").then(|| "Ana".to_string()));
///
/// assert_eq!(resolver.resolve(&TargetRef::new("Person", Some("1"))), Some("Ana".to_string()));
/// assert_eq!(resolver.resolve(&TargetRef::new("Company", Some("1"))), None);
/// ```
pub struct TargetResolver<T> {
    lookups: HashMap<String, Lookup<T>>,
}

impl<T> TargetResolver<T> {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self {
            lookups: HashMap::new(),
        }
    }

    /// Registers the lookup for one type, replacing any previous one.
    pub fn register<F>(mut self, type_name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<T> + Send + Sync + 'static,
    {
        self.lookups.insert(type_name.into(), Box::new(lookup));
        self
    }

    /// True if a lookup exists for the type.
    pub fn supports(&self, type_name: &str) -> bool {
        self.lookups.contains_key(type_name)
    }

    /// Looks the referenced record up.
    pub fn resolve(&self, target: &TargetRef) -> Option<T> {
        let id = target.id()?;
        let lookup = self.lookups.get(target.type_name())?;
        lookup(id)
    }
}

impl<T> Default for TargetResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TargetResolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetResolver")
            .field("types", &self.lookups.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_id_when_present() {
        assert_eq!(TargetRef::new("Person", Some("3")).to_string(), "Person#3");
        assert_eq!(TargetRef::new("Person", None::<String>).to_string(), "Person");
    }

    #[test]
    fn resolve_requires_an_id() {
        let resolver = TargetResolver::new().register("Person", |id| Some(id.to_string()));

        assert!(resolver.supports("Person"));
        assert_eq!(
            resolver.resolve(&TargetRef::new("Person", Some("5"))),
            Some("5".to_string())
        );
        assert_eq!(resolver.resolve(&TargetRef::new("Person", None::<String>)), None);
    }
}
