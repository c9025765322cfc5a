//! Client implementation for the static identity plugin.
//!
//! Implements `IdentityServicePluginClient` using the domain service.

use std::sync::Arc;

use async_trait::async_trait;
use auth_session_sdk::{
    IdentityServiceError, IdentityServicePluginClient, RoleAssignment, Session, SessionListener,
    SignUpOptions, SignUpOutcome, SubscriptionId,
};
use secrecy::SecretString;
use uuid::Uuid;

use super::service::Service;

#[async_trait]
impl IdentityServicePluginClient for Service {
    fn subscribe(&self, listener: Arc<dyn SessionListener>) -> SubscriptionId {
        Service::subscribe(self, listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        Service::unsubscribe(self, id);
    }

    async fn get_session(&self) -> Result<Option<Session>, IdentityServiceError> {
        Ok(self.current_session())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        options: SignUpOptions,
    ) -> Result<SignUpOutcome, IdentityServiceError> {
        Service::sign_up(self, email, password, options)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), IdentityServiceError> {
        self.sign_in(email, password)
    }

    async fn sign_out(&self) -> Result<(), IdentityServiceError> {
        Service::sign_out(self);
        Ok(())
    }

    async fn has_role(
        &self,
        identity_id: Uuid,
        role_name: &str,
    ) -> Result<bool, IdentityServiceError> {
        Service::has_role(self, identity_id, role_name)
    }

    async fn select_role_assignments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, IdentityServiceError> {
        Service::select_role_assignments(self, user_id)
    }

    async fn insert_role_assignments(
        &self,
        rows: Vec<RoleAssignment>,
    ) -> Result<(), IdentityServiceError> {
        Service::insert_role_assignments(self, rows)
    }

    async fn update_role_assignment(
        &self,
        user_id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<(), IdentityServiceError> {
        Service::update_role_assignment(self, user_id, from, to)
    }
}
