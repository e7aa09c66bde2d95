//! Request-scoped storage of the acting party and request metadata.
//!
//! A [`RequestContext`] is installed for the duration of one request and
//! read back by any code further down the call stack through
//! [`RequestContext::current`], without threading it through every
//! signature. Installation is always scoped:
//!
//! - [`RequestContext::scope`] binds it to an async task (tokio task-local)
//! - [`RequestContext::sync_scope`] binds it for the duration of a closure
//! - [`RequestContext::enter`] binds it to the current thread until the
//!   returned guard drops
//!
//! Every form restores the previous state when the scope ends, including
//! when the handler panics or its future is dropped before completion.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::net::IpAddr;

use tracing::Instrument;
use uuid::Uuid;

use crate::request::{Actor, ActorId};

tokio::task_local! {
    static TASK_CONTEXT: RequestContext;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

/// Identity and metadata of the request currently being handled.
///
/// # Examples
///
/// ```
/// use audit_scope::{Actor, RequestContext};
///
/// assert!(RequestContext::current().is_anonymous());
///
/// let ctx = RequestContext::new(Some(Actor::new("u1", "alice")))
///     .with_user_agent("curl/8.0");
///
/// let name = ctx.sync_scope(|| {
///     RequestContext::current().actor().map(|a| a.username.clone())
/// });
///
/// assert_eq!(name.as_deref(), Some("alice"));
/// assert!(RequestContext::current().is_anonymous());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    request_id: Option<String>,
    actor: Option<Actor>,
    ip: Option<IpAddr>,
    user_agent: String,
}

impl RequestContext {
    /// Creates a context for a new request with a generated request id.
    pub fn new(actor: Option<Actor>) -> Self {
        Self {
            request_id: Some(Uuid::new_v4().to_string()),
            actor,
            ip: None,
            user_agent: String::new(),
        }
    }

    /// The value observed when nothing is installed.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Overrides the request id (e.g. one propagated from an upstream proxy).
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
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

    /// Returns the installed context, or [`RequestContext::anonymous`].
    ///
    /// A task-local context takes precedence over a thread-local one.
    pub fn current() -> Self {
        TASK_CONTEXT
            .try_with(Clone::clone)
            .ok()
            .or_else(|| THREAD_CONTEXT.with(|slot| slot.borrow().clone()))
            .unwrap_or_default()
    }

    /// Runs `future` with this context installed for the current task.
    ///
    /// The context is removed when the future completes or is dropped.
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        let span = tracing::info_span!(
            "request",
            request_id = ?self.request_id,
            actor = ?self.actor_id(),
        );
        TASK_CONTEXT.scope(self, future.instrument(span)).await
    }

    /// Runs `f` with this context installed.
    pub fn sync_scope<F, R>(self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        TASK_CONTEXT.sync_scope(self, f)
    }

    /// Installs this context on the current thread until the guard drops.
    ///
    /// Intended for thread-per-request servers. Nested guards restore the
    /// outer context when they drop.
    #[must_use = "the context is cleared as soon as the guard is dropped"]
    pub fn enter(self) -> ContextGuard {
        let previous = THREAD_CONTEXT.with(|slot| slot.borrow_mut().replace(self));
        ContextGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// Returns the request id, if one was assigned.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the acting party, if authenticated.
    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// Returns the acting party's id, if authenticated.
    pub fn actor_id(&self) -> Option<&ActorId> {
        self.actor.as_ref().map(|a| &a.id)
    }

    /// Returns the source address.
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// Returns the user-agent string (empty when unknown).
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// True when no actor is attached.
    pub fn is_anonymous(&self) -> bool {
        self.actor.is_none()
    }
}

/// Keeps a thread-local [`RequestContext`] installed while alive.
#[derive(Debug)]
pub struct ContextGuard {
    previous: Option<RequestContext>,
    // Thread-local state must be released on the thread that installed it.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_CONTEXT.with(|slot| *slot.borrow_mut() = previous);
    }
}
