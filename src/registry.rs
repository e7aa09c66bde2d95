//! Statically declared set of monitored entity types.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::config::AuditConfig;
use crate::entity::Entity;

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Errors raised by registry installation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// [`Registry::install`] was already called in this process.
    #[error("monitored type registry is already installed")]
    AlreadyInstalled,
}

/// Describes one monitored entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    type_name: String,
}

impl EntityDescriptor {
    /// Descriptor for a Rust entity type.
    pub fn of<E: Entity>() -> Self {
        Self::named(E::TYPE_NAME)
    }

    /// Descriptor for a type known only by name.
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    /// Returns the type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// The set of entity types subject to change tracking.
///
/// Built once at startup; types absent from it are invisible to the tracker.
///
/// # Examples
///
/// ```
/// use audit_scope::Registry;
///
/// let registry = Registry::builder()
///     .register("Person")
///     .register("Company")
///     .build();
///
/// assert!(registry.contains("Person"));
/// assert!(!registry.contains("Invoice"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<String, EntityDescriptor>,
}

impl Registry {
    /// Starts an empty registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry holding the configured monitored types.
    pub fn from_config(config: &AuditConfig) -> Self {
        config
            .monitored_types
            .iter()
            .fold(Self::builder(), |builder, name| builder.register(name.as_str()))
            .build()
    }

    /// True if the type is monitored.
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Iterates descriptors in name order.
    pub fn descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.types.values()
    }

    /// Number of monitored types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if nothing is monitored.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Makes this registry the process-wide one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyInstalled`] on every call after the
    /// first; the installed registry is never replaced.
    pub fn install(self) -> Result<Arc<Registry>, RegistryError> {
        let registry = Arc::new(self);
        GLOBAL
            .set(Arc::clone(&registry))
            .map_err(|_| RegistryError::AlreadyInstalled)?;
        tracing::info!(
            monitored = ?registry.types.keys().collect::<Vec<_>>(),
            "change tracking enabled"
        );
        Ok(registry)
    }

    /// The process-wide registry, if installed.
    pub fn global() -> Option<Arc<Registry>> {
        GLOBAL.get().cloned()
    }
}

/// Accumulates descriptors for a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: BTreeMap<String, EntityDescriptor>,
}

impl RegistryBuilder {
    /// Adds a type by name. Registering twice is harmless.
    pub fn register(self, type_name: impl Into<String>) -> Self {
        self.descriptor(EntityDescriptor::named(type_name))
    }

    /// Adds a Rust entity type.
    pub fn entity<E: Entity>(self) -> Self {
        self.descriptor(EntityDescriptor::of::<E>())
    }

    /// Adds a prepared descriptor.
    pub fn descriptor(mut self, descriptor: EntityDescriptor) -> Self {
        self.types
            .insert(descriptor.type_name().to_string(), descriptor);
        self
    }

    /// Freezes the set.
    pub fn build(self) -> Registry {
        Registry { types: self.types }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_is_deduplicated() {
        let registry = Registry::builder()
            .register("Person")
            .register("Person")
            .build();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn from_config_registers_monitored_types() {
        let config = AuditConfig {
            monitored_types: vec!["Contract".to_string(), "City".to_string()],
            ..AuditConfig::default()
        };

        let registry = Registry::from_config(&config);
        let names: Vec<_> = registry.descriptors().map(EntityDescriptor::type_name).collect();
        assert_eq!(names, vec!["City", "Contract"]);
    }

    #[test]
    fn empty_registry_monitors_nothing() {
        let registry = Registry::default();
        assert!(registry.is_empty());
        assert!(!registry.contains("Person"));
    }

    #[test]
    fn install_is_write_once() {
        let first = Registry::builder().register("Person").build().install();
        let second = Registry::builder().register("Company").build().install();

        // Other tests in this binary never install, so the first call wins.
        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), RegistryError::AlreadyInstalled);
        let global = Registry::global().unwrap();
        assert!(global.contains("Person"));
        assert!(!global.contains("Company"));
    }
}
