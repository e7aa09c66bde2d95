//! Request adapter for mapping HTTP requests to a [`RequestContext`].

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;

use crate::context::RequestContext;
use crate::request::Actor;

/// Header carrying the proxy chain, client first.
pub const FORWARDED_FOR: &str = "x-forwarded-for";
/// Header carrying the client address set by a single proxy.
pub const REAL_IP: &str = "x-real-ip";
/// Header carrying the client software identification.
pub const USER_AGENT: &str = "user-agent";

/// Framework-agnostic view of an incoming request.
///
/// Framework-specific code builds a `RequestAdapter` from its own request
/// type, sets the actor resolved by its authentication layer, and runs the
/// handler through [`RequestAdapter::run`] or
/// [`RequestAdapter::run_async`].
///
/// Header names are matched case-insensitively.
///
/// # Examples
///
/// ```
/// use audit_scope::web::RequestAdapter;
/// use audit_scope::{Actor, RequestContext};
///
/// let mut adapter = RequestAdapter::new();
/// adapter.add_header("X-Forwarded-For", "203.0.113.7, 10.0.0.1");
/// adapter.add_header("User-Agent", "Mozilla/5.0");
/// adapter.set_actor(Some(Actor::new("u1", "alice")));
///
/// let ip = adapter.run(|| RequestContext::current().ip());
/// assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
/// assert!(RequestContext::current().is_anonymous());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestAdapter {
    request_id: Option<String>,
    actor: Option<Actor>,
    peer: Option<IpAddr>,
    headers: HashMap<String, String>,
}

impl RequestAdapter {
    /// An adapter with no headers, no peer address and no actor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a request id supplied by the framework instead of a generated one.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the authenticated actor, if any.
    pub fn set_actor(&mut self, actor: Option<Actor>) {
        self.actor = actor;
    }

    /// Sets the address of the directly connected peer.
    pub fn set_peer(&mut self, peer: Option<IpAddr>) {
        self.peer = peer;
    }

    /// Adds a header. A repeated name replaces the earlier value.
    pub fn add_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// A header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The authenticated actor, if any.
    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// Client address.
    ///
    /// The first entry of `X-Forwarded-For` wins, then `X-Real-IP`, then the
    /// peer address. A header whose value does not parse as an address is
    /// ignored rather than recorded.
    pub fn client_ip(&self) -> Option<IpAddr> {
        let forwarded = self
            .header(FORWARDED_FOR)
            .and_then(|chain| chain.split(',').next())
            .and_then(parse_ip);
        if forwarded.is_some() {
            return forwarded;
        }

        self.header(REAL_IP).and_then(parse_ip).or(self.peer)
    }

    /// The `User-Agent` header, or empty.
    pub fn user_agent(&self) -> &str {
        self.header(USER_AGENT).unwrap_or_default()
    }

    /// Builds the context for this request.
    pub fn to_context(&self) -> RequestContext {
        let ctx = RequestContext::new(self.actor.clone())
            .with_ip(self.client_ip())
            .with_user_agent(self.user_agent());
        match &self.request_id {
            Some(id) => ctx.with_request_id(id.clone()),
            None => ctx,
        }
    }

    /// Runs a synchronous handler with this request's context installed.
    ///
    /// The context is cleared when `handler` returns or panics.
    pub fn run<F, R>(&self, handler: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.to_context().sync_scope(handler)
    }

    /// Runs an async handler with this request's context bound to the task.
    pub async fn run_async<F>(&self, handler: F) -> F::Output
    where
        F: Future,
    {
        self.to_context().scope(handler).await
    }
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    match raw.parse() {
        Ok(ip) => Some(ip),
        Err(_) => {
            if !raw.is_empty() {
                tracing::debug!(value = raw, "unparsable client address dropped");
            }
            None
        }
    }
}
