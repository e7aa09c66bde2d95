//! Append-only audit storage.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::{AuditEvent, AuditFilter, AuditQuery};

/// Failure to persist an audit event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditWriteError {
    /// The log has reached its configured size limit.
    #[error("audit log is full ({limit} events)")]
    CapacityExceeded {
        /// Configured maximum number of events
        limit: usize,
    },
    /// The storage backend rejected the write.
    #[error("audit backend error: {0}")]
    Backend(String),
}

/// Append-only store of [`AuditEvent`]s.
///
/// Events cannot be edited or removed once appended.
pub trait AuditLog: Send + Sync {
    /// Persists an event synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`AuditWriteError`] when the event could not be stored.
    fn append(&self, event: AuditEvent) -> Result<(), AuditWriteError>;

    /// Returns the events matching `filter`, newest first.
    fn query(&self, filter: &AuditFilter) -> AuditQuery;
}

impl<L: AuditLog + ?Sized> AuditLog for Arc<L> {
    fn append(&self, event: AuditEvent) -> Result<(), AuditWriteError> {
        (**self).append(event)
    }

    fn query(&self, filter: &AuditFilter) -> AuditQuery {
        (**self).query(filter)
    }
}

/// In-process audit log.
///
/// Events are kept ordered by creation time. An optional capacity limit
/// makes appends fail once reached.
///
/// # Example
///
/// ```
/// use audit_scope::audit::{AuditEvent, AuditFilter, AuditLog, MemoryAuditLog};
///
/// let log = MemoryAuditLog::new();
/// log.append(AuditEvent::login("Login: alice")).unwrap();
///
/// assert_eq!(log.len(), 1);
/// assert_eq!(log.query(&AuditFilter::new()).count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: RwLock<Vec<Arc<AuditEvent>>>,
    limit: Option<usize>,
}

impl MemoryAuditLog {
    /// Creates an unbounded log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log that rejects appends beyond `limit` events.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            limit: Some(limit),
        }
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, event: AuditEvent) -> Result<(), AuditWriteError> {
        let mut events = self.events.write();
        if let Some(limit) = self.limit {
            if events.len() >= limit {
                return Err(AuditWriteError::CapacityExceeded { limit });
            }
        }

        // Equal timestamps keep append order.
        let at = events.partition_point(|e| e.created_at() <= event.created_at());
        events.insert(at, Arc::new(event));
        Ok(())
    }

    fn query(&self, filter: &AuditFilter) -> AuditQuery {
        AuditQuery::new(self.events.read().clone(), filter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, TargetRef};
    use chrono::{Duration, Utc};

    #[test]
    fn starts_empty() {
        let log = MemoryAuditLog::new();
        assert!(log.is_empty());
        assert_eq!(log.query(&AuditFilter::new()).count(), 0);
    }

    #[test]
    fn out_of_order_timestamps_are_sorted() {
        let log = MemoryAuditLog::new();
        let now = Utc::now();

        log.append(AuditEvent::login("late").at(now)).unwrap();
        log.append(AuditEvent::login("early").at(now - Duration::hours(1)))
            .unwrap();

        let labels: Vec<_> = log
            .query(&AuditFilter::new())
            .iter()
            .map(|e| e.target_label().to_string())
            .collect();
        assert_eq!(labels, vec!["late", "early"]);
    }

    #[test]
    fn same_timestamp_keeps_newest_append_first() {
        let log = MemoryAuditLog::new();
        let now = Utc::now();
        let target = TargetRef::new("Person", Some("1"));

        log.append(AuditEvent::create(target.clone(), "first").at(now))
            .unwrap();
        log.append(AuditEvent::delete(target, "second").at(now)).unwrap();

        let query = log.query(&AuditFilter::new());
        let first = query.iter().next().unwrap();
        assert_eq!(first.action(), AuditAction::Delete);
    }

    #[test]
    fn limit_rejects_further_appends() {
        let log = MemoryAuditLog::with_limit(1);
        log.append(AuditEvent::login("one")).unwrap();

        let err = log.append(AuditEvent::login("two")).unwrap_err();
        assert_eq!(err, AuditWriteError::CapacityExceeded { limit: 1 });
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn query_is_a_snapshot() {
        let log = MemoryAuditLog::new();
        log.append(AuditEvent::login("one")).unwrap();

        let query = log.query(&AuditFilter::new());
        log.append(AuditEvent::login("two")).unwrap();

        assert_eq!(query.count(), 1);
        assert_eq!(log.query(&AuditFilter::new()).count(), 2);
    }
}
