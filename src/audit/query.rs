//! Filtering and iteration over recorded events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{AuditAction, AuditEvent};
use crate::request::ActorId;

/// Criteria for [`AuditLog::query`](super::AuditLog::query).
///
/// Unset criteria match everything; the time range is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuditFilter {
    actor: Option<ActorId>,
    action: Option<AuditAction>,
    target_type: Option<String>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Matches every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only events by this actor.
    pub fn actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Only events with this action.
    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Only events about this entity type.
    pub fn target_type(mut self, type_name: impl Into<String>) -> Self {
        self.target_type = Some(type_name.into());
        self
    }

    /// Only events created at or after `since`.
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Only events created at or before `until`.
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// The actor criterion, if set.
    pub fn actor_criterion(&self) -> Option<&ActorId> {
        self.actor.as_ref()
    }

    /// Returns true if `event` satisfies every set criterion.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(actor) = &self.actor {
            if event.actor() != Some(actor) {
                return false;
            }
        }
        if let Some(action) = self.action {
            if event.action() != action {
                return false;
            }
        }
        if let Some(type_name) = &self.target_type {
            if event.target_type() != Some(type_name.as_str()) {
                return false;
            }
        }
        if self.since.is_some_and(|since| event.created_at() < since) {
            return false;
        }
        if self.until.is_some_and(|until| event.created_at() > until) {
            return false;
        }
        true
    }
}

/// Result of a query: a finite, restartable, newest-first sequence.
///
/// The set of candidate events is fixed when the query is made; filtering
/// happens lazily on each call to [`AuditQuery::iter`].
#[derive(Debug, Clone)]
pub struct AuditQuery {
    // Oldest first; iteration walks it backwards.
    events: Vec<Arc<AuditEvent>>,
    filter: AuditFilter,
}

impl AuditQuery {
    /// Wraps events ordered oldest-first by creation time.
    pub fn new(events: Vec<Arc<AuditEvent>>, filter: AuditFilter) -> Self {
        Self { events, filter }
    }

    /// Iterates matching events, newest first. May be called repeatedly.
    pub fn iter(&self) -> impl Iterator<Item = &AuditEvent> + '_ {
        self.events
            .iter()
            .rev()
            .map(Arc::as_ref)
            .filter(move |event| self.filter.matches(event))
    }

    /// The filter this query applies.
    pub fn filter(&self) -> &AuditFilter {
        &self.filter
    }

    /// Number of matching events.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// True if nothing matches.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for &'a AuditQuery {
    type Item = &'a AuditEvent;
    type IntoIter = Box<dyn Iterator<Item = &'a AuditEvent> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
