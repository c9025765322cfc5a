//! Local (in-process) client for the auth session module.

use std::sync::Arc;

use async_trait::async_trait;
use auth_session_sdk::{AuthSessionClient, AuthSessionError, AuthView, Role, SignUpRequest};
use secrecy::SecretString;
use tokio::sync::watch;
use uuid::Uuid;

use super::{DomainError, SessionManager};

/// Local client wrapping the manager.
///
/// Handed to consumers by [`AuthSession`](crate::module::AuthSession).
pub struct AuthSessionLocalClient {
    svc: Arc<SessionManager>,
}

impl AuthSessionLocalClient {
    #[must_use]
    pub fn new(svc: Arc<SessionManager>) -> Self {
        Self { svc }
    }
}

fn log_and_convert(op: &str, e: DomainError) -> AuthSessionError {
    match &e {
        DomainError::IdentityService(_) | DomainError::Forbidden(_) => {
            tracing::debug!(operation = op, error = %e, "auth_session call rejected");
        }
        _ => tracing::error!(operation = op, error = ?e, "auth_session call failed"),
    }
    e.into()
}

#[async_trait]
impl AuthSessionClient for AuthSessionLocalClient {
    fn view(&self) -> AuthView {
        self.svc.view()
    }

    fn subscribe(&self) -> watch::Receiver<AuthView> {
        self.svc.subscribe()
    }

    async fn register(&self, request: SignUpRequest) -> Result<(), AuthSessionError> {
        self.svc
            .register(request)
            .await
            .map_err(|e| log_and_convert("register", e))
    }

    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), AuthSessionError> {
        self.svc
            .sign_in(email, password)
            .await
            .map_err(|e| log_and_convert("sign_in", e))
    }

    async fn sign_out(&self) -> Result<(), AuthSessionError> {
        self.svc
            .sign_out()
            .await
            .map_err(|e| log_and_convert("sign_out", e))
    }

    async fn refresh_roles(&self) -> Result<(), AuthSessionError> {
        self.svc
            .refresh_roles()
            .map_err(|e| log_and_convert("refresh_roles", e))
    }

    async fn change_role(
        &self,
        user_id: Uuid,
        from: Role,
        to: Role,
    ) -> Result<(), AuthSessionError> {
        self.svc
            .change_role(user_id, from, to)
            .await
            .map_err(|e| log_and_convert("change_role", e))
    }
}
