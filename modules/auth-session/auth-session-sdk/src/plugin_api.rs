//! Contract of the hosted identity service.
//!
//! Implementations wrap the identity/database backend (or an in-memory
//! stand-in). The session manager consumes only this trait.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use uuid::Uuid;

use crate::error::IdentityServiceError;
use crate::models::{RoleAssignment, Session, SessionEvent, SignUpOptions, SignUpOutcome};

/// Handle returned by [`IdentityServicePluginClient::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Receiver of session-change notifications.
///
/// Called synchronously from the identity service's dispatch, possibly while
/// the service holds internal locks. Implementations must not call back into
/// the identity service from this method.
pub trait SessionListener: Send + Sync {
    fn on_session_change(&self, event: SessionEvent, session: Option<Session>);
}

/// Identity service API consumed by the session manager.
#[async_trait]
pub trait IdentityServicePluginClient: Send + Sync {
    /// Register a session-change listener.
    fn subscribe(&self, listener: Arc<dyn SessionListener>) -> SubscriptionId;

    /// Remove a listener registered with [`subscribe`](Self::subscribe).
    fn unsubscribe(&self, id: SubscriptionId);

    /// One-shot query of the current session.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the service cannot be reached
    async fn get_session(&self) -> Result<Option<Session>, IdentityServiceError>;

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// - `AlreadyRegistered` if the email is taken
    /// - `Validation` for malformed input
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        options: SignUpOptions,
    ) -> Result<SignUpOutcome, IdentityServiceError>;

    /// Verify an email/password pair and start a session.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` if the pair is rejected
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), IdentityServiceError>;

    /// Revoke the current session.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the revoke call did not reach the service
    async fn sign_out(&self) -> Result<(), IdentityServiceError>;

    /// Server-side `has_role` predicate.
    ///
    /// # Errors
    ///
    /// - Any transport or policy evaluation failure
    async fn has_role(&self, identity_id: Uuid, role_name: &str)
    -> Result<bool, IdentityServiceError>;

    /// Select role-assignment rows for a user.
    ///
    /// # Errors
    ///
    /// - Any query failure
    async fn select_role_assignments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, IdentityServiceError>;

    /// Insert role-assignment rows.
    ///
    /// # Errors
    ///
    /// - Any insert failure (the batch may be partially applied)
    async fn insert_role_assignments(
        &self,
        rows: Vec<RoleAssignment>,
    ) -> Result<(), IdentityServiceError>;

    /// Rewrite one role-assignment row of a user.
    ///
    /// # Errors
    ///
    /// - `Validation` if the user does not hold `from`
    /// - Any update failure
    async fn update_role_assignment(
        &self,
        user_id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<(), IdentityServiceError>;
}
