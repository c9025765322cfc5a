//! Error types for the auth session module.

use thiserror::Error;

/// Errors reported by the hosted identity service.
///
/// Returned by every [`IdentityServicePluginClient`](crate::IdentityServicePluginClient)
/// call. Sign-up and sign-in failures reach the caller verbatim; role and
/// privilege failures are absorbed by the resolver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityServiceError {
    /// Email/password pair was rejected.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already registered")]
    AlreadyRegistered,

    /// The request was malformed (empty password, bad email, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The service could not be reached or refused the call.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred on the service side.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors that can occur when using the auth session API.
#[derive(Debug, Error)]
pub enum AuthSessionError {
    /// Account creation or credential verification failed.
    #[error(transparent)]
    IdentityService(#[from] IdentityServiceError),

    /// The operation requires elevated privilege the current view lacks.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The session manager has been shut down.
    #[error("session manager stopped")]
    Stopped,

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A role name outside the closed [`Role`](crate::Role) set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);
