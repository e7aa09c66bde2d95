use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::Violation;
use crate::policy::Policy;
use crate::request::Actor;

/// An ordered chain of policies combined with logical AND.
///
/// The first policy that refuses the actor determines the reported
/// violation. A member may itself accept any of several capabilities
/// ([`GroupPolicy::any_of`](crate::GroupPolicy::any_of)).
///
/// # Examples
///
/// ```
/// use audit_scope::{Actor, Authenticated, GroupPolicy, PolicyGate};
///
/// let gate = PolicyGate::new()
///     .require(Authenticated)
///     .require(GroupPolicy::any_of(["staff"]));
///
/// let staff = Actor::new("u1", "alice").with_capability("staff");
/// assert!(gate.check(Some(&staff)).is_ok());
/// assert!(gate.check(None).unwrap_err().is_redirect());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PolicyGate {
    policies: Vec<Arc<dyn Policy>>,
}

impl PolicyGate {
    /// An empty chain, which lets everyone through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a policy, deduplicating identical requirements.
    ///
    /// If a policy with the same [`Policy::key`] is already present it will
    /// not be added again.
    pub fn require(self, policy: impl Policy + 'static) -> Self {
        self.require_shared(Arc::new(policy))
    }

    /// Appends an already shared policy.
    pub fn require_shared(mut self, policy: Arc<dyn Policy>) -> Self {
        let key = policy.key();
        if !self.policies.iter().any(|p| p.key() == key) {
            self.policies.push(policy);
        }
        self
    }

    /// Appends every policy of `other` after this chain's.
    pub fn then(self, other: &PolicyGate) -> Self {
        other
            .policies
            .iter()
            .cloned()
            .fold(self, PolicyGate::require_shared)
    }

    /// Evaluates the chain for `actor`.
    ///
    /// # Errors
    ///
    /// Returns the first failing policy's [`Violation`].
    pub fn check(&self, actor: Option<&Actor>) -> Result<(), Violation> {
        for policy in &self.policies {
            if let Err(violation) = policy.check(actor) {
                tracing::warn!(
                    actor = ?actor.map(|a| &a.id),
                    policy = %policy.key(),
                    violation = %violation,
                    "operation denied"
                );
                return Err(violation);
            }
        }
        Ok(())
    }

    /// Evaluates the chain for the actor of the current request context.
    ///
    /// # Errors
    ///
    /// Returns the first failing policy's [`Violation`].
    pub fn check_current(&self) -> Result<RequestContext, Violation> {
        let ctx = RequestContext::current();
        self.check(ctx.actor())?;
        Ok(ctx)
    }

    /// Number of policies in the chain.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// True if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
