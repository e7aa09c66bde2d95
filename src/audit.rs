//! Append-only audit trail of changes to monitored records.
//!
//! This module provides:
//! - `AuditEvent`: immutable record of a create/update/delete/login/logout
//! - `TargetRef` and `TargetResolver`: polymorphic reference to any
//!   monitored type, resolved through an explicit lookup map
//! - `AuditLog`: append-only storage trait, with `MemoryAuditLog`
//! - `AuditFilter` and `AuditQuery`: newest-first, restartable queries
//! - `AuditRecorder`: attributes events to the current request
//! - `ActivityFeed`: the log as seen by one actor
//!
//! Events carry only identifiers, labels and stringified field values.

mod event;
mod feed;
mod log;
mod query;
mod recorder;
mod target;

pub use event::{AuditAction, AuditEvent, Changes, FieldChange, MalformedEvent};
pub use feed::ActivityFeed;
pub use log::{AuditLog, AuditWriteError, MemoryAuditLog};
pub use query::{AuditFilter, AuditQuery};
pub use recorder::AuditRecorder;
pub use target::{TargetRef, TargetResolver};
