//! Snapshot-and-diff change tracking around entity writes.
//!
//! [`ChangeTracker`] implements [`LifecycleHooks`]. For monitored types it
//! reads the persisted state before an update, diffs it against the state
//! after the write, and records the outcome through an [`AuditRecorder`].
//!
//! The snapshot read and the write are not one transaction. Two requests
//! updating the same record concurrently may each diff against a snapshot
//! the other has already overwritten; the event reflects whichever snapshot
//! each request read.

mod diff;

use std::sync::Arc;

pub use diff::diff_snapshots;

use crate::audit::{AuditLog, AuditRecorder};
use crate::config::AuditConfig;
use crate::entity::Tracked;
use crate::error::Result;
use crate::registry::Registry;
use crate::store::{LifecycleHooks, PreWrite, SnapshotLoader};

/// Records create, update and delete events for monitored types.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use audit_scope::{ChangeTracker, Registry};
/// use audit_scope::audit::MemoryAuditLog;
///
/// let registry = Arc::new(Registry::builder().register("Person").build());
/// let tracker = ChangeTracker::new(registry, Arc::new(MemoryAuditLog::new()));
///
/// assert!(tracker.is_monitored("Person"));
/// assert!(!tracker.is_monitored("Invoice"));
/// ```
#[derive(Debug, Clone)]
pub struct ChangeTracker {
    registry: Arc<Registry>,
    recorder: AuditRecorder,
    excluded: Vec<String>,
}

impl ChangeTracker {
    /// Tracker with the default diff exclusions.
    pub fn new(registry: Arc<Registry>, log: Arc<dyn AuditLog>) -> Self {
        Self::from_config(&AuditConfig::default(), registry, log)
    }

    /// Tracker using the configured exclusions.
    pub fn from_config(
        config: &AuditConfig,
        registry: Arc<Registry>,
        log: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            registry,
            recorder: AuditRecorder::new(log),
            excluded: config.diff_exclusions(),
        }
    }

    /// Replaces the diff exclusion list.
    pub fn with_excluded_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = fields.into_iter().map(Into::into).collect();
        self
    }

    /// True if writes to `type_name` are tracked.
    pub fn is_monitored(&self, type_name: &str) -> bool {
        self.registry.contains(type_name)
    }

    /// The recorder events go through.
    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }
}

impl LifecycleHooks for ChangeTracker {
    fn before_write(
        &self,
        entity: &dyn Tracked,
        is_create: bool,
        loader: &dyn SnapshotLoader,
    ) -> PreWrite {
        if !self.is_monitored(entity.type_name()) {
            tracing::trace!(type_name = entity.type_name(), "untracked write");
            return PreWrite::Untracked;
        }

        if is_create {
            return PreWrite::Create;
        }
        let Some(id) = entity.target_id() else {
            tracing::warn!(
                type_name = entity.type_name(),
                "update without an id, nothing to diff against"
            );
            return PreWrite::Update(None);
        };

        match loader.load_snapshot(id) {
            Ok(Some(snapshot)) => PreWrite::Update(Some(snapshot)),
            Ok(None) => {
                tracing::warn!(
                    type_name = entity.type_name(),
                    id,
                    "no persisted state to diff against"
                );
                PreWrite::Update(None)
            }
            Err(err) => {
                tracing::warn!(
                    type_name = entity.type_name(),
                    id,
                    error = %err,
                    "persisted state unreadable, update will not be diffed"
                );
                PreWrite::Update(None)
            }
        }
    }

    fn after_write(&self, entity: &dyn Tracked, pre: PreWrite) -> Result<()> {
        match pre {
            PreWrite::Untracked | PreWrite::Update(None) => Ok(()),
            PreWrite::Create => Ok(self.recorder.record_create(entity)?),
            PreWrite::Update(Some(before)) => {
                let after = match entity.snapshot() {
                    Ok(after) => after,
                    Err(err) => {
                        tracing::warn!(
                            type_name = entity.type_name(),
                            error = %err,
                            "written state unreadable, update not diffed"
                        );
                        return Ok(());
                    }
                };

                let changes = diff_snapshots(&before, &after, &self.excluded);
                if changes.is_empty() {
                    tracing::debug!(
                        type_name = entity.type_name(),
                        id = ?entity.target_id(),
                        "update without tracked changes"
                    );
                    return Ok(());
                }
                Ok(self.recorder.record_update(entity, changes)?)
            }
        }
    }

    fn after_delete(&self, entity: &dyn Tracked) -> Result<()> {
        if !self.is_monitored(entity.type_name()) {
            return Ok(());
        }
        Ok(self.recorder.record_delete(entity)?)
    }
}
