//! Auth session module lifecycle.

use std::sync::Arc;

use auth_session_sdk::{AuthSessionClient, IdentityServicePluginClient};
use tracing::info;

use crate::config::AuthSessionConfig;
use crate::domain::{AuthSessionLocalClient, SessionManager};

/// Running auth session module.
///
/// Owns the manager and the client handed to consumers. Start it once at
/// application start and [`stop`](Self::stop) it on shutdown; consumers get
/// the context through [`client`](Self::client) rather than a global.
pub struct AuthSession {
    manager: Arc<SessionManager>,
    client: Arc<dyn AuthSessionClient>,
}

impl AuthSession {
    /// Start the manager against an identity service.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(cfg: AuthSessionConfig, identity: Arc<dyn IdentityServicePluginClient>) -> Self {
        info!(
            elevated_role = %cfg.elevated_role,
            sign_out_errors = ?cfg.sign_out_errors,
            "Initializing auth_session"
        );

        let manager = SessionManager::start(cfg, identity);
        let client: Arc<dyn AuthSessionClient> =
            Arc::new(AuthSessionLocalClient::new(manager.clone()));

        Self { manager, client }
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn AuthSessionClient> {
        self.client.clone()
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub async fn stop(self) {
        self.manager.shutdown().await;
    }
}
