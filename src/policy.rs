use std::fmt;

use crate::config::{AuditConfig, DEFAULT_ADMIN_CAPABILITY};
use crate::error::{Violation, ViolationKind};
use crate::request::Actor;

/// A gate placed in front of an operation.
///
/// Policies are evaluated by [`PolicyGate`](crate::PolicyGate) in the
/// order they were added.
pub trait Policy: fmt::Debug + Send + Sync {
    /// Whether `actor` may proceed. `None` is an anonymous request.
    fn allow(&self, actor: Option<&Actor>) -> bool;

    /// The denial to report when [`Policy::allow`] is false.
    fn on_deny(&self, actor: Option<&Actor>) -> Violation;

    /// Identity used to drop duplicate policies from a chain.
    fn key(&self) -> String;

    /// Evaluates the policy.
    ///
    /// # Errors
    ///
    /// Returns the [`Policy::on_deny`] violation when not allowed.
    fn check(&self, actor: Option<&Actor>) -> Result<(), Violation> {
        if self.allow(actor) {
            Ok(())
        } else {
            Err(self.on_deny(actor))
        }
    }
}

/// Requires an authenticated actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

impl Policy for Authenticated {
    fn allow(&self, actor: Option<&Actor>) -> bool {
        actor.is_some()
    }

    fn on_deny(&self, _actor: Option<&Actor>) -> Violation {
        Violation::authentication_required()
    }

    fn key(&self) -> String {
        "authenticated".to_string()
    }
}

/// Requires at least one of a set of capabilities.
///
/// Privileged actors and holders of the administrator capability always
/// pass. An empty capability set places no restriction at all.
///
/// # Examples
///
/// ```
/// use audit_scope::{Actor, GroupPolicy, Policy};
///
/// let policy = GroupPolicy::any_of(["staff", "auditor"]);
///
/// assert!(policy.allow(Some(&Actor::new("u1", "alice").with_capability("auditor"))));
/// assert!(policy.allow(Some(&Actor::new("u2", "root").privileged())));
/// assert!(!policy.allow(Some(&Actor::new("u3", "bob"))));
/// assert!(!policy.allow(None));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPolicy {
    required: Vec<String>,
    admin_capability: String,
}

impl GroupPolicy {
    /// Passes actors holding any of `capabilities`.
    pub fn any_of<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut required: Vec<String> = capabilities.into_iter().map(Into::into).collect();
        required.sort();
        required.dedup();
        Self {
            required,
            admin_capability: DEFAULT_ADMIN_CAPABILITY.to_string(),
        }
    }

    /// A policy that lets everyone through.
    pub fn unrestricted() -> Self {
        Self::any_of(std::iter::empty::<String>())
    }

    /// Uses a different administrator capability.
    pub fn with_admin_capability(mut self, capability: impl Into<String>) -> Self {
        self.admin_capability = capability.into();
        self
    }

    /// Uses the configured administrator capability.
    pub fn configured(self, config: &AuditConfig) -> Self {
        self.with_admin_capability(config.admin_capability.clone())
    }

    /// The accepted capabilities.
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

impl Policy for GroupPolicy {
    fn allow(&self, actor: Option<&Actor>) -> bool {
        if self.required.is_empty() {
            return true;
        }
        let Some(actor) = actor else {
            return false;
        };
        actor.is_privileged()
            || actor.has_capability(&self.admin_capability)
            || self.required.iter().any(|cap| actor.has_capability(cap))
    }

    fn on_deny(&self, actor: Option<&Actor>) -> Violation {
        if actor.is_none() {
            return Violation::authentication_required();
        }

        let message = match self.required.as_slice() {
            [only] => format!("Access restricted to the '{only}' capability"),
            many => format!(
                "Access restricted to the capabilities: {}",
                many.iter()
                    .map(|c| format!("'{c}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        Violation::new(
            ViolationKind::PermissionDenied {
                required: self.required.clone(),
            },
            message,
        )
    }

    fn key(&self) -> String {
        format!("group:{}", self.required.join("|"))
    }
}

/// Restricts an operation to administrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOnly {
    admin_capability: String,
}

impl AdminOnly {
    /// Administrators are holders of `admin_capability` or privileged actors.
    pub fn new(admin_capability: impl Into<String>) -> Self {
        Self {
            admin_capability: admin_capability.into(),
        }
    }
}

impl Default for AdminOnly {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_CAPABILITY)
    }
}

impl Policy for AdminOnly {
    fn allow(&self, actor: Option<&Actor>) -> bool {
        actor.is_some_and(|a| a.is_privileged() || a.has_capability(&self.admin_capability))
    }

    fn on_deny(&self, actor: Option<&Actor>) -> Violation {
        if actor.is_none() {
            return Violation::authentication_required();
        }
        Violation::new(
            ViolationKind::PermissionDenied {
                required: vec![self.admin_capability.clone()],
            },
            "Access restricted to administrators",
        )
    }

    fn key(&self) -> String {
        format!("admin:{}", self.admin_capability)
    }
}
