//! Audit event schema.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::TargetRef;
use crate::context::RequestContext;
use crate::request::ActorId;

/// What happened to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// A monitored record was created
    Create,
    /// A monitored record changed in at least one tracked field
    Update,
    /// A monitored record was removed
    Delete,
    /// An actor signed in
    Login,
    /// An actor signed out
    Logout,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Create => write!(f, "create"),
            AuditAction::Update => write!(f, "update"),
            AuditAction::Delete => write!(f, "delete"),
            AuditAction::Login => write!(f, "login"),
            AuditAction::Logout => write!(f, "logout"),
        }
    }
}

/// Old and new string forms of one field. `None` stands for a null value.
///
/// Serialized as a two-element array: `["111", "222"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange(pub Option<String>, pub Option<String>);

impl FieldChange {
    /// Value before the write.
    pub fn before(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Value after the write.
    pub fn after(&self) -> Option<&str> {
        self.1.as_deref()
    }
}

/// Field name to old/new values, in the field order of the record.
pub type Changes = IndexMap<String, FieldChange>;

/// An immutable record of one auditable action.
///
/// Events are built with the constructors below, enriched with request
/// metadata, then handed to an [`AuditLog`](super::AuditLog). Nothing can
/// change an event once it has been appended.
///
/// # Example
///
/// ```
/// use audit_scope::audit::{AuditAction, AuditEvent, TargetRef};
///
/// let event = AuditEvent::create(TargetRef::new("Person", Some("1")), "Ana Souza");
///
/// assert_eq!(event.action(), AuditAction::Create);
/// assert!(event.changes().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord")]
pub struct AuditEvent {
    id: Uuid,
    actor: Option<ActorId>,
    action: AuditAction,
    target: Option<TargetRef>,
    target_label: String,
    changes: Option<Changes>,
    ip: Option<IpAddr>,
    user_agent: String,
    created_at: DateTime<Utc>,
}

/// A stored event that none of the [`AuditEvent`] constructors could have
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEvent {
    /// Field changes on an event other than an update
    #[error("{0} event carries field changes")]
    UnexpectedChanges(AuditAction),
    /// An update with no field changes
    #[error("update event has no field changes")]
    EmptyUpdate,
}

#[derive(Deserialize)]
struct EventRecord {
    id: Uuid,
    actor: Option<ActorId>,
    action: AuditAction,
    target: Option<TargetRef>,
    target_label: String,
    changes: Option<Changes>,
    ip: Option<IpAddr>,
    user_agent: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRecord> for AuditEvent {
    type Error = MalformedEvent;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        match (record.action, &record.changes) {
            (AuditAction::Update, Some(changes)) if !changes.is_empty() => {}
            (AuditAction::Update, _) => return Err(MalformedEvent::EmptyUpdate),
            (action, Some(_)) => return Err(MalformedEvent::UnexpectedChanges(action)),
            (_, None) => {}
        }

        Ok(Self {
            id: record.id,
            actor: record.actor,
            action: record.action,
            target: record.target,
            target_label: record.target_label,
            changes: record.changes,
            ip: record.ip,
            user_agent: record.user_agent,
            created_at: record.created_at,
        })
    }
}

impl AuditEvent {
    fn base(action: AuditAction, target: Option<TargetRef>, label: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: None,
            action,
            target,
            target_label: label,
            changes: None,
            ip: None,
            user_agent: String::new(),
            created_at: Utc::now(),
        }
    }

    /// A record was created.
    pub fn create(target: TargetRef, label: impl Into<String>) -> Self {
        Self::base(AuditAction::Create, Some(target), label.into())
    }

    /// A record changed. Returns `None` when `changes` is empty, since an
    /// update without a diff is not an auditable event.
    pub fn update(target: TargetRef, label: impl Into<String>, changes: Changes) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }
        let mut event = Self::base(AuditAction::Update, Some(target), label.into());
        event.changes = Some(changes);
        Some(event)
    }

    /// A record was removed.
    pub fn delete(target: TargetRef, label: impl Into<String>) -> Self {
        Self::base(AuditAction::Delete, Some(target), label.into())
    }

    /// An actor signed in.
    pub fn login(label: impl Into<String>) -> Self {
        Self::base(AuditAction::Login, None, label.into())
    }

    /// An actor signed out.
    pub fn logout(label: impl Into<String>) -> Self {
        Self::base(AuditAction::Logout, None, label.into())
    }

    /// Copies actor, ip and user-agent from a request context.
    pub fn from_context(mut self, ctx: &RequestContext) -> Self {
        self.actor = ctx.actor_id().cloned();
        self.ip = ctx.ip();
        self.user_agent = ctx.user_agent().to_string();
        self
    }

    /// Attributes the event to an actor (or to nobody).
    pub fn by(mut self, actor: Option<ActorId>) -> Self {
        self.actor = actor;
        self
    }

    /// Sets the source address.
    pub fn with_ip(mut self, ip: Option<IpAddr>) -> Self {
        self.ip = ip;
        self
    }

    /// Sets the user-agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the creation time (imports and tests).
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns the event id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the actor, `None` for anonymous or system events.
    pub fn actor(&self) -> Option<&ActorId> {
        self.actor.as_ref()
    }

    /// Returns the action.
    pub fn action(&self) -> AuditAction {
        self.action
    }

    /// Returns the polymorphic target reference.
    pub fn target(&self) -> Option<&TargetRef> {
        self.target.as_ref()
    }

    /// Returns the target type name.
    pub fn target_type(&self) -> Option<&str> {
        self.target.as_ref().map(TargetRef::type_name)
    }

    /// Returns the target id.
    pub fn target_id(&self) -> Option<&str> {
        self.target.as_ref().and_then(TargetRef::id)
    }

    /// Returns the label frozen at write time.
    pub fn target_label(&self) -> &str {
        &self.target_label
    }

    /// Returns the field changes (only for updates).
    pub fn changes(&self) -> Option<&Changes> {
        self.changes.as_ref()
    }

    /// Returns the source address.
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// Returns the user-agent string.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Renders changes as `field: 'old' → 'new'` pairs.
    pub fn changes_display(&self) -> String {
        let Some(changes) = self.changes.as_ref().filter(|c| !c.is_empty()) else {
            return "No changes recorded".to_string();
        };

        changes
            .iter()
            .map(|(field, change)| {
                format!(
                    "{}: '{}' → '{}'",
                    field,
                    change.before().unwrap_or("None"),
                    change.after().unwrap_or("None")
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ",
            self.created_at.format("%d/%m/%Y %H:%M"),
            self.actor.as_ref().map_or("anonymous", ActorId::as_str),
            self.action
        )?;

        match (self.target_label.as_str(), self.target_id()) {
            ("", Some(id)) => write!(f, "#{id}"),
            ("", None) => write!(f, "system"),
            (label, _) => write!(f, "{label}"),
        }
    }
}
