//! Web framework integration surface.
//!
//! This module is the boundary between HTTP frameworks and the request
//! context. It contains no framework-specific code:
//! - [`RequestAdapter`] collects headers, peer address and the
//!   authenticated actor, and runs handlers with a [`RequestContext`]
//!   installed
//! - [`reject`] maps authorization and scoping errors to [`Rejection`]s
//!
//! # Example Flow
//!
//! ```
//! use std::sync::Arc;
//! use audit_scope::web::{reject, RequestAdapter};
//! use audit_scope::{Actor, MemoryStore, ScopedRepository};
//! # use audit_scope::{ActorId, Entity};
//! # #[derive(Debug, Clone, serde::Serialize)]
//! # struct Note { id: Option<String>, owner: Option<ActorId> }
//! # impl Entity for Note {
//! #     const TYPE_NAME: &'static str = "Note";
//! #     fn id(&self) -> Option<&str> { self.id.as_deref() }
//! #     fn set_id(&mut self, id: String) { self.id = Some(id); }
//! #     fn owner(&self) -> Option<&ActorId> { self.owner.as_ref() }
//! #     fn set_owner(&mut self, owner: Option<ActorId>) { self.owner = owner; }
//! #     fn label(&self) -> String { "note".to_string() }
//! # }
//!
//! let notes = ScopedRepository::new(Arc::new(MemoryStore::<Note>::new()));
//!
//! let mut adapter = RequestAdapter::new();
//! adapter.add_header("X-Real-IP", "192.0.2.10");
//! adapter.set_actor(Some(Actor::new("u1", "alice")));
//!
//! let rejection = adapter
//!     .run(|| notes.detail("42"))
//!     .map_err(reject)
//!     .unwrap_err()
//!     .unwrap();
//! assert_eq!(rejection.status(), 404);
//! ```
//!
//! [`RequestContext`]: crate::RequestContext

mod adapter;
mod middleware;

pub use adapter::{RequestAdapter, FORWARDED_FOR, REAL_IP, USER_AGENT};
pub use middleware::{reject, reject_with_login, Rejection, DEFAULT_LOGIN_PATH};
