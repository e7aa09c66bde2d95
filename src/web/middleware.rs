//! Mapping of crate errors to HTTP-level outcomes.
//!
//! Authorization and scoping failures become [`Rejection`]s that a
//! framework turns into a response. Audit and storage failures are not
//! rejections: they propagate unchanged so the framework reports a server
//! error.
//!
//! ```text
//! AuthenticationRequired  -> redirect to login
//! PermissionDenied        -> 403 with the denial message
//! NotFound                -> 404
//! AuditWrite / Store      -> propagated
//! ```

use crate::error::{Error, ViolationKind};

/// Default path anonymous visitors are redirected to.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// A client-facing refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The visitor must sign in first.
    RedirectToLogin {
        /// Where to send the visitor.
        location: String,
    },
    /// The actor is known but lacks a required capability.
    Forbidden {
        /// Human-readable denial.
        message: String,
    },
    /// Missing, or owned by someone else.
    NotFound,
}

impl Rejection {
    /// HTTP status code for this rejection.
    pub fn status(&self) -> u16 {
        match self {
            Rejection::RedirectToLogin { .. } => 302,
            Rejection::Forbidden { .. } => 403,
            Rejection::NotFound => 404,
        }
    }
}

/// Converts a handler error into a [`Rejection`] using
/// [`DEFAULT_LOGIN_PATH`].
///
/// # Errors
///
/// Returns the original error when it is not a client-facing refusal.
///
/// # Examples
///
/// ```
/// use audit_scope::web::{reject, Rejection};
/// use audit_scope::{Error, Violation};
///
/// let rejection = reject(Error::from(Violation::authentication_required())).unwrap();
/// assert_eq!(rejection.status(), 302);
///
/// let rejection = reject(Error::not_found("Person", "7")).unwrap();
/// assert_eq!(rejection, Rejection::NotFound);
/// ```
pub fn reject(err: Error) -> Result<Rejection, Error> {
    reject_with_login(err, DEFAULT_LOGIN_PATH)
}

/// Like [`reject`] with a custom login location.
///
/// # Errors
///
/// Returns the original error when it is not a client-facing refusal.
pub fn reject_with_login(err: Error, login_path: &str) -> Result<Rejection, Error> {
    match err {
        Error::Violation(violation) => match violation.kind {
            ViolationKind::AuthenticationRequired => Ok(Rejection::RedirectToLogin {
                location: login_path.to_string(),
            }),
            ViolationKind::PermissionDenied { .. } => Ok(Rejection::Forbidden {
                message: violation.message,
            }),
        },
        Error::NotFound { .. } => Ok(Rejection::NotFound),
        other => {
            tracing::error!(error = %other, "request failed");
            Err(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditWriteError;
    use crate::error::Violation;

    #[test]
    fn anonymous_is_redirected() {
        let rejection =
            reject_with_login(Violation::authentication_required().into(), "/accounts/login")
                .unwrap();
        assert_eq!(
            rejection,
            Rejection::RedirectToLogin {
                location: "/accounts/login".to_string()
            }
        );
    }

    #[test]
    fn denial_keeps_message() {
        let violation = Violation::new(
            ViolationKind::PermissionDenied {
                required: vec!["staff".to_string()],
            },
            "Access restricted to the 'staff' capability",
        );
        let rejection = reject(violation.into()).unwrap();

        assert_eq!(rejection.status(), 403);
        assert_eq!(
            rejection,
            Rejection::Forbidden {
                message: "Access restricted to the 'staff' capability".to_string()
            }
        );
    }

    #[test]
    fn not_found_is_404() {
        let rejection = reject(Error::not_found("Person", "1")).unwrap();
        assert_eq!(rejection.status(), 404);
    }

    #[test]
    fn audit_failures_propagate() {
        let err = reject(AuditWriteError::CapacityExceeded { limit: 0 }.into()).unwrap_err();
        assert!(matches!(err, Error::AuditWrite(_)));
    }
}
