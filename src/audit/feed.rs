//! Activity history as seen by one actor.

use super::{AuditFilter, AuditQuery, AuditRecorder};
use crate::request::Actor;
use crate::scope::{AccessScope, RowScope};

/// Scoped view over the audit log for presentation code.
///
/// Administrators see every event. Everyone else sees only the events they
/// performed themselves, whatever actor criterion the filter carries.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    recorder: AuditRecorder,
    scope: AccessScope,
}

impl ActivityFeed {
    /// Creates a feed over `recorder`'s log.
    pub fn new(recorder: AuditRecorder, scope: AccessScope) -> Self {
        Self { recorder, scope }
    }

    /// Events visible to `actor` that match `filter`, newest first.
    pub fn visible_to(&self, actor: &Actor, filter: AuditFilter) -> AuditQuery {
        let filter = match self.scope.scope_for_read(actor) {
            RowScope::All => filter,
            RowScope::OwnedBy(own) => {
                if filter.actor_criterion().is_some_and(|requested| *requested != own) {
                    tracing::debug!(actor = %own, "feed filter narrowed to own events");
                }
                filter.actor(own)
            }
        };
        self.recorder.query(&filter)
    }
}
