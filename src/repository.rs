//! Policy-gated, owner-scoped CRUD over a [`Store`].

use std::marker::PhantomData;

use crate::config::AuditConfig;
use crate::context::RequestContext;
use crate::entity::Entity;
use crate::error::{Error, Result, Violation};
use crate::gate::PolicyGate;
use crate::policy::Authenticated;
use crate::request::Actor;
use crate::scope::AccessScope;
use crate::store::Store;

/// Kind of operation a [`ScopedRepository`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Listing rows
    List,
    /// Fetching one row by id
    Detail,
    /// Creating a row
    Create,
    /// Updating a row
    Update,
    /// Deleting a row
    Delete,
}

/// One policy chain per operation kind.
///
/// Every chain is preceded by [`Authenticated`] when used through a
/// [`ScopedRepository`].
#[derive(Debug, Clone, Default)]
pub struct OperationPolicies {
    list: PolicyGate,
    detail: PolicyGate,
    create: PolicyGate,
    update: PolicyGate,
    delete: PolicyGate,
}

impl OperationPolicies {
    /// The same chain for every operation.
    pub fn uniform(gate: PolicyGate) -> Self {
        Self {
            list: gate.clone(),
            detail: gate.clone(),
            create: gate.clone(),
            update: gate.clone(),
            delete: gate,
        }
    }

    /// Replaces the chain for one operation.
    pub fn with(mut self, operation: Operation, gate: PolicyGate) -> Self {
        *self.slot(operation) = gate;
        self
    }

    /// The chain for one operation.
    pub fn gate(&self, operation: Operation) -> &PolicyGate {
        match operation {
            Operation::List => &self.list,
            Operation::Detail => &self.detail,
            Operation::Create => &self.create,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        }
    }

    fn slot(&mut self, operation: Operation) -> &mut PolicyGate {
        match operation {
            Operation::List => &mut self.list,
            Operation::Detail => &mut self.detail,
            Operation::Create => &mut self.create,
            Operation::Update => &mut self.update,
            Operation::Delete => &mut self.delete,
        }
    }
}

/// List/detail/create/update/delete operations acting on behalf of the
/// actor in the current [`RequestContext`].
///
/// Each operation requires an authenticated actor, passes the operation's
/// policy chain, then applies [`AccessScope`]. Rows owned by someone else
/// are reported as [`Error::NotFound`].
#[derive(Debug)]
pub struct ScopedRepository<E: Entity, S: Store<E>> {
    store: S,
    scope: AccessScope,
    policies: OperationPolicies,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: Store<E>> ScopedRepository<E, S> {
    /// Repository with the default scope and no extra policies.
    pub fn new(store: S) -> Self {
        Self {
            store,
            scope: AccessScope::default(),
            policies: OperationPolicies::default(),
            _entity: PhantomData,
        }
    }

    /// Repository whose scope follows `config`.
    pub fn from_config(store: S, config: &AuditConfig) -> Self {
        Self::new(store).with_scope(AccessScope::from_config(config))
    }

    /// Replaces the access scope.
    pub fn with_scope(mut self, scope: AccessScope) -> Self {
        self.scope = scope;
        self
    }

    /// Replaces the per-operation policies.
    pub fn with_policies(mut self, policies: OperationPolicies) -> Self {
        self.policies = policies;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rows visible to the current actor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Violation`] when a policy refuses the actor.
    pub fn list(&self) -> Result<Vec<E>> {
        let actor = self.admit(Operation::List)?;
        let rows = self.store.list()?;
        Ok(self.scope.scope_for_read(&actor).filter(rows))
    }

    /// One row by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for missing rows and for rows owned by
    /// another actor.
    pub fn detail(&self, id: &str) -> Result<E> {
        let actor = self.admit(Operation::Detail)?;
        self.fetch_scoped(&actor, id)
    }

    /// Persists a new row owned by the current actor.
    ///
    /// # Errors
    ///
    /// Returns policy, store or audit errors.
    pub fn create(&self, mut entity: E) -> Result<E> {
        let actor = self.admit(Operation::Create)?;
        self.scope.assign_owner_on_create(&actor, &mut entity);
        self.store.insert(entity)
    }

    /// Applies `change` to a row and persists it.
    ///
    /// Identity and ownership are restored after `change` runs; neither can
    /// be altered through this path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for missing or foreign rows, policy,
    /// store or audit errors.
    pub fn update<F>(&self, id: &str, change: F) -> Result<E>
    where
        F: FnOnce(&mut E),
    {
        let actor = self.admit(Operation::Update)?;
        let mut entity = self.fetch_scoped(&actor, id)?;
        let owner = entity.owner().cloned();

        change(&mut entity);

        entity.set_id(id.to_string());
        entity.set_owner(owner);
        self.store.update(entity)
    }

    /// Removes a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for missing or foreign rows, policy,
    /// store or audit errors.
    pub fn delete(&self, id: &str) -> Result<E> {
        let actor = self.admit(Operation::Delete)?;
        self.fetch_scoped(&actor, id)?;
        self.store.delete(id)
    }

    fn admit(&self, operation: Operation) -> Result<Actor> {
        let ctx = PolicyGate::new()
            .require(Authenticated)
            .then(self.policies.gate(operation))
            .check_current()?;
        ctx.actor()
            .cloned()
            .ok_or_else(|| Error::from(Violation::authentication_required()))
    }

    fn fetch_scoped(&self, actor: &Actor, id: &str) -> Result<E> {
        let entity = self
            .store
            .get(id)?
            .ok_or_else(|| Error::not_found(E::TYPE_NAME, id))?;
        self.scope.scope_for_write(actor, &entity)?;
        Ok(entity)
    }
}
