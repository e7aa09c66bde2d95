//! Ownership-based row scoping.

use crate::config::{AuditConfig, DEFAULT_ADMIN_CAPABILITY};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::request::{Actor, ActorId};

/// Which rows an actor may see or touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowScope {
    /// Every row (privileged or administrator actors)
    All,
    /// Only rows owned by this actor
    OwnedBy(ActorId),
}

impl RowScope {
    /// Applies the predicate to a row's owner.
    pub fn matches(&self, owner: Option<&ActorId>) -> bool {
        match self {
            RowScope::All => true,
            RowScope::OwnedBy(actor) => owner == Some(actor),
        }
    }

    /// Keeps only the rows the predicate admits.
    pub fn filter<E: Entity>(&self, rows: impl IntoIterator<Item = E>) -> Vec<E> {
        rows.into_iter()
            .filter(|row| self.matches(row.owner()))
            .collect()
    }
}

/// Narrows reads and writes to the actor's own records.
///
/// # Examples
///
/// ```
/// use audit_scope::{AccessScope, Actor, RowScope};
///
/// let scope = AccessScope::default();
/// let alice = Actor::new("u1", "alice");
/// let admin = Actor::new("u9", "carol").with_capability("administrator");
///
/// assert_eq!(scope.scope_for_read(&alice), RowScope::OwnedBy(alice.id.clone()));
/// assert_eq!(scope.scope_for_read(&admin), RowScope::All);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    admin_capability: String,
}

impl AccessScope {
    /// Scope whose bypass capability is `admin_capability`.
    pub fn new(admin_capability: impl Into<String>) -> Self {
        Self {
            admin_capability: admin_capability.into(),
        }
    }

    /// Scope configured from [`AuditConfig`].
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.admin_capability.clone())
    }

    /// The bypass capability.
    pub fn admin_capability(&self) -> &str {
        &self.admin_capability
    }

    /// Privileged actors and holders of the administrator capability.
    pub fn is_admin(&self, actor: &Actor) -> bool {
        actor.is_privileged() || actor.has_capability(&self.admin_capability)
    }

    /// Rows `actor` may list.
    pub fn scope_for_read(&self, actor: &Actor) -> RowScope {
        if self.is_admin(actor) {
            RowScope::All
        } else {
            RowScope::OwnedBy(actor.id.clone())
        }
    }

    /// Checks that `actor` may modify or delete `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the instance belongs to another
    /// actor, so the caller cannot tell it apart from a missing record.
    pub fn scope_for_write<E: Entity>(&self, actor: &Actor, instance: &E) -> Result<()> {
        if self.scope_for_read(actor).matches(instance.owner()) {
            return Ok(());
        }

        tracing::warn!(
            actor = %actor.id,
            type_name = E::TYPE_NAME,
            id = ?instance.id(),
            "access outside actor scope reported as not found"
        );
        Err(Error::not_found(
            E::TYPE_NAME,
            instance.id().unwrap_or_default(),
        ))
    }

    /// Makes `actor` the owner of a new instance, discarding any owner the
    /// caller supplied.
    pub fn assign_owner_on_create<E: Entity>(&self, actor: &Actor, instance: &mut E) {
        instance.set_owner(Some(actor.id.clone()));
    }
}

impl Default for AccessScope {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_CAPABILITY)
    }
}
