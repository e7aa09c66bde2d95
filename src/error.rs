use std::fmt;

use thiserror::Error;

use crate::audit::AuditWriteError;
use crate::store::StoreError;

/// Errors surfaced by the audit and authorization layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A policy in front of the operation refused the actor.
    #[error("Policy violation: {0}")]
    Violation(#[from] Violation),

    /// The record does not exist, or belongs to someone the actor may not see.
    #[error("{type_name} #{id} not found")]
    NotFound {
        /// Monitored type name
        type_name: &'static str,
        /// Requested identifier
        id: String,
    },

    /// Appending to the audit log failed. Fatal for the triggering write.
    #[error("Audit write failed: {0}")]
    AuditWrite(#[from] AuditWriteError),

    /// The persistence layer failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// Builds a [`Error::NotFound`] for the given type and id.
    pub fn not_found(type_name: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            type_name,
            id: id.into(),
        }
    }

    /// Returns the violation kind when this error is a policy denial.
    pub fn violation_kind(&self) -> Option<&ViolationKind> {
        match self {
            Error::Violation(v) => Some(&v.kind),
            _ => None,
        }
    }

    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A policy violation with details about what failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message explaining the violation
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an authentication-required violation.
    pub fn authentication_required() -> Self {
        Self::new(
            ViolationKind::AuthenticationRequired,
            "Authentication required",
        )
    }

    /// Whether an interactive front end should redirect to its login page.
    pub fn is_redirect(&self) -> bool {
        self.kind == ViolationKind::AuthenticationRequired
    }
}

/// The kind of policy violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// No actor is attached to the request and the policy demands one
    AuthenticationRequired,
    /// The actor lacks every capability the policy accepts
    PermissionDenied {
        /// Capabilities that would have satisfied the policy
        required: Vec<String>,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::AuthenticationRequired => write!(f, "Authentication required"),
            ViolationKind::PermissionDenied { required } => {
                write!(f, "Permission denied (requires any of: {})", required.join(", "))
            }
        }
    }
}
