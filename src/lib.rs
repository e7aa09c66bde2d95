//! Change auditing and row-level authorization for record-keeping services.
//!
//! This crate records who changed what, and restricts which records an
//! actor may see or modify:
//! - **Request context**: the acting party and request metadata, installed
//!   per request and readable anywhere below it
//! - **Change tracking**: snapshot-and-diff around writes to monitored
//!   types, producing create/update/delete audit events
//! - **Audit log**: append-only, queryable history of those events
//! - **Access scope**: owner-based row visibility, bypassed by
//!   administrators
//! - **Policies**: capability requirements placed in front of operations
//!
//! # Core Types
//!
//! - [`RequestContext`]: who is acting, from where
//! - [`ChangeTracker`]: lifecycle hooks that feed the audit log
//! - [`audit::AuditLog`]: append-only event storage
//! - [`AccessScope`]: owner filter for reads, ownership check for writes
//! - [`PolicyGate`]: ordered chain of [`Policy`] checks
//! - [`ScopedRepository`]: all of the above applied to one entity type
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use audit_scope::audit::{AuditAction, AuditFilter, AuditLog, MemoryAuditLog};
//! use audit_scope::{
//!     Actor, ActorId, ChangeTracker, Entity, MemoryStore, Registry, RequestContext,
//!     ScopedRepository,
//! };
//! use serde::Serialize;
//!
//! #[derive(Debug, Clone, Serialize)]
//! struct Person {
//!     id: Option<String>,
//!     owner: Option<ActorId>,
//!     name: String,
//!     phone: String,
//! }
//!
//! impl Entity for Person {
//!     const TYPE_NAME: &'static str = "Person";
//!     fn id(&self) -> Option<&str> { self.id.as_deref() }
//!     fn set_id(&mut self, id: String) { self.id = Some(id); }
//!     fn owner(&self) -> Option<&ActorId> { self.owner.as_ref() }
//!     fn set_owner(&mut self, owner: Option<ActorId>) { self.owner = owner; }
//!     fn label(&self) -> String { self.name.clone() }
//! }
//!
//! let log = Arc::new(MemoryAuditLog::new());
//! let registry = Arc::new(Registry::builder().entity::<Person>().build());
//! let tracker = Arc::new(ChangeTracker::new(registry, log.clone()));
//! let people = ScopedRepository::new(MemoryStore::<Person>::with_hooks(tracker));
//!
//! let alice = RequestContext::new(Some(Actor::new("u1", "alice")));
//! alice.sync_scope(|| {
//!     let p = people.create(Person {
//!         id: None,
//!         owner: None,
//!         name: "Ana".to_string(),
//!         phone: "111".to_string(),
//!     })?;
//!     people.update(p.id().unwrap_or_default(), |p| p.phone = "222".to_string())?;
//!     Ok::<_, audit_scope::Error>(())
//! })
//! .unwrap();
//!
//! let updates = log.query(&AuditFilter::new().action(AuditAction::Update));
//! let event = updates.iter().next().unwrap();
//! assert_eq!(event.actor(), Some(&ActorId::new("u1")));
//! assert_eq!(event.changes_display(), "phone: '111' → '222'");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod config;
mod context;
mod entity;
mod error;
mod gate;
mod policy;
mod registry;
mod repository;
mod request;
mod scope;
mod store;
pub mod tracker;
pub mod web;

pub use config::{AuditConfig, ConfigError, DEFAULT_ADMIN_CAPABILITY, DEFAULT_OWNER_FIELD};
pub use context::{ContextGuard, RequestContext};
pub use entity::{snapshot_of, Entity, Snapshot, SnapshotError, Tracked};
pub use error::{Error, Result, Violation, ViolationKind};
pub use gate::PolicyGate;
pub use policy::{AdminOnly, Authenticated, GroupPolicy, Policy};
pub use registry::{EntityDescriptor, Registry, RegistryBuilder, RegistryError};
pub use repository::{Operation, OperationPolicies, ScopedRepository};
pub use request::{Actor, ActorId};
pub use scope::{AccessScope, RowScope};
pub use store::{LifecycleHooks, MemoryStore, PreWrite, SnapshotLoader, Store, StoreError};
pub use tracker::ChangeTracker;
