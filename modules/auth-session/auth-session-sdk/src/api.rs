//! Public API trait for the auth session module.
//!
//! This trait defines the interface that consumers (routers, profile
//! displays, guarded admin pages) use to read authentication state and to
//! register, sign in and sign out.

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::AuthSessionError;
use crate::models::{AuthView, Role, SignUpRequest};

/// Public API trait for the auth session manager.
///
/// ```ignore
/// let view = auth.view();
/// auth.sign_in("a@x.com", &password).await?;
/// ```
#[async_trait]
pub trait AuthSessionClient: Send + Sync {
    /// Current snapshot of the authentication state.
    fn view(&self) -> AuthView;

    /// Receiver notified on every view change.
    fn subscribe(&self) -> watch::Receiver<AuthView>;

    /// Create an account and assign the selected roles (best effort).
    ///
    /// Success is reported even if role assignment fails.
    ///
    /// # Errors
    ///
    /// - `IdentityService` if account creation fails
    /// - `Stopped` if the manager has been shut down
    async fn register(&self, request: SignUpRequest) -> Result<(), AuthSessionError>;

    /// Verify credentials. The view changes through the notification path.
    ///
    /// # Errors
    ///
    /// - `IdentityService` if the credentials are rejected
    /// - `Stopped` if the manager has been shut down
    async fn sign_in(&self, email: &str, password: &SecretString)
    -> Result<(), AuthSessionError>;

    /// Revoke the session and clear roles and elevated privilege locally.
    ///
    /// # Errors
    ///
    /// - `IdentityService` only when configured to propagate revoke failures
    /// - `Stopped` if the manager has been shut down
    async fn sign_out(&self) -> Result<(), AuthSessionError>;

    /// Re-run role and privilege resolution for the current identity.
    ///
    /// # Errors
    ///
    /// - `Stopped` if the manager has been shut down
    async fn refresh_roles(&self) -> Result<(), AuthSessionError>;

    /// Replace one role of a user. Requires elevated privilege.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the current view is not elevated
    /// - `IdentityService` if the update is rejected
    /// - `Stopped` if the manager has been shut down
    async fn change_role(&self, user_id: Uuid, from: Role, to: Role)
    -> Result<(), AuthSessionError>;
}
