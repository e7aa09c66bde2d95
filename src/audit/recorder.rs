//! Builds events from the current request and appends them.

use std::sync::Arc;

use super::{AuditEvent, AuditFilter, AuditLog, AuditQuery, AuditWriteError, Changes, TargetRef};
use crate::context::RequestContext;
use crate::entity::Tracked;
use crate::request::Actor;

/// Attributes events to the current [`RequestContext`] and writes them.
///
/// Each successful append is mirrored as a structured `tracing` event on
/// the `audit_scope::audit` target.
#[derive(Clone)]
pub struct AuditRecorder {
    log: Arc<dyn AuditLog>,
}

impl AuditRecorder {
    /// Wraps a log.
    pub fn new(log: Arc<dyn AuditLog>) -> Self {
        Self { log }
    }

    /// The underlying log.
    pub fn log(&self) -> &Arc<dyn AuditLog> {
        &self.log
    }

    /// Appends `event` after attaching the current request metadata.
    ///
    /// # Errors
    ///
    /// Propagates the log's [`AuditWriteError`].
    pub fn record(&self, event: AuditEvent) -> Result<(), AuditWriteError> {
        self.append(event.from_context(&RequestContext::current()))
    }

    /// Records creation of `entity`.
    ///
    /// # Errors
    ///
    /// Propagates the log's [`AuditWriteError`].
    pub fn record_create(&self, entity: &dyn Tracked) -> Result<(), AuditWriteError> {
        self.record(AuditEvent::create(target_of(entity), entity.target_label()))
    }

    /// Records an update. Does nothing when `changes` is empty.
    ///
    /// # Errors
    ///
    /// Propagates the log's [`AuditWriteError`].
    pub fn record_update(
        &self,
        entity: &dyn Tracked,
        changes: Changes,
    ) -> Result<(), AuditWriteError> {
        match AuditEvent::update(target_of(entity), entity.target_label(), changes) {
            Some(event) => self.record(event),
            None => Ok(()),
        }
    }

    /// Records removal of `entity`.
    ///
    /// # Errors
    ///
    /// Propagates the log's [`AuditWriteError`].
    pub fn record_delete(&self, entity: &dyn Tracked) -> Result<(), AuditWriteError> {
        self.record(AuditEvent::delete(target_of(entity), entity.target_label()))
    }

    /// Records a sign-in. The actor is explicit since the request context
    /// is usually still anonymous at that point.
    ///
    /// # Errors
    ///
    /// Propagates the log's [`AuditWriteError`].
    pub fn record_login(&self, actor: &Actor) -> Result<(), AuditWriteError> {
        let ctx = RequestContext::current();
        self.append(
            AuditEvent::login(format!("Login: {}", actor.username))
                .from_context(&ctx)
                .by(Some(actor.id.clone())),
        )
    }

    /// Records a sign-out.
    ///
    /// # Errors
    ///
    /// Propagates the log's [`AuditWriteError`].
    pub fn record_logout(&self, actor: Option<&Actor>) -> Result<(), AuditWriteError> {
        let ctx = RequestContext::current();
        let name = actor.map_or("anonymous", |a| a.username.as_str());
        self.append(
            AuditEvent::logout(format!("Logout: {name}"))
                .from_context(&ctx)
                .by(actor.map(|a| a.id.clone())),
        )
    }

    /// Queries the underlying log.
    pub fn query(&self, filter: &AuditFilter) -> AuditQuery {
        self.log.query(filter)
    }

    fn append(&self, event: AuditEvent) -> Result<(), AuditWriteError> {
        let summary = (
            event.id(),
            event.action(),
            event.actor().cloned(),
            event.target().cloned(),
        );
        let changed = event.changes().map(|c| c.keys().cloned().collect::<Vec<_>>());
        let ip = event.ip();

        match self.log.append(event) {
            Ok(()) => {
                let (id, action, actor, target) = summary;
                tracing::info!(
                    target: "audit_scope::audit",
                    event_id = %id,
                    action = %action,
                    actor = ?actor,
                    target = ?target,
                    changed = ?changed,
                    ip = ?ip,
                    "audit event"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    target: "audit_scope::audit",
                    action = %summary.1,
                    error = %err,
                    "audit write failed"
                );
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder").finish_non_exhaustive()
    }
}

fn target_of(entity: &dyn Tracked) -> TargetRef {
    TargetRef::new(entity.type_name(), entity.target_id())
}
