//! Domain errors for the auth session module.

use auth_session_sdk::{AuthSessionError, IdentityServiceError};

/// Internal domain errors.
///
/// `RoleQuery`, `PrivilegeCheck` and `RoleAssignment` are absorbed by the
/// manager and never reach callers.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    IdentityService(#[from] IdentityServiceError),

    #[error("role query failed: {0}")]
    RoleQuery(String),

    #[error("privilege check failed: {0}")]
    PrivilegeCheck(String),

    #[error("role assignment failed: {0}")]
    RoleAssignment(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("session manager stopped")]
    Stopped,
}

impl DomainError {
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

impl From<DomainError> for AuthSessionError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::IdentityService(inner) => Self::IdentityService(inner),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
            DomainError::Stopped => Self::Stopped,
            DomainError::RoleQuery(reason)
            | DomainError::PrivilegeCheck(reason)
            | DomainError::RoleAssignment(reason) => Self::Internal(reason),
        }
    }
}
