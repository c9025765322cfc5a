//! Role and elevated-privilege resolution.
//!
//! Ordinary roles fail open (an error yields no roles) while elevated
//! privilege fails closed (an error yields `false`).

use std::collections::BTreeSet;
use std::sync::Arc;

use auth_session_sdk::{IdentityServicePluginClient, Role, RoleAssignment};
use tracing::{debug, warn};
use uuid::Uuid;

use super::error::DomainError;

/// Derives authorization facts for an identity from the identity service.
pub struct RoleResolver {
    identity: Arc<dyn IdentityServicePluginClient>,
    elevated_role: Role,
}

impl RoleResolver {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityServicePluginClient>, elevated_role: Role) -> Self {
        Self {
            identity,
            elevated_role,
        }
    }

    /// Roles assigned to `identity_id`. Empty when there is no identity, no
    /// assignment, or the query fails.
    #[tracing::instrument(skip_all, fields(identity_id = ?identity_id))]
    pub async fn fetch_roles(&self, identity_id: Option<Uuid>) -> BTreeSet<Role> {
        let Some(id) = identity_id else {
            return BTreeSet::new();
        };

        match self.query_roles(id).await {
            Ok(roles) => {
                debug!(count = roles.len(), "Fetched roles");
                roles
            }
            Err(e) => {
                warn!(error = %e, "Role query failed, treating identity as having no roles");
                BTreeSet::new()
            }
        }
    }

    /// Server-side elevated privilege check. `false` on any error.
    #[tracing::instrument(skip_all, fields(identity_id = ?identity_id, role = %self.elevated_role))]
    pub async fn check_elevated_privilege(&self, identity_id: Option<Uuid>) -> bool {
        let Some(id) = identity_id else {
            return false;
        };

        match self.query_privilege(id).await {
            Ok(elevated) => {
                debug!(elevated, "Checked elevated privilege");
                elevated
            }
            Err(e) => {
                warn!(error = %e, "Privilege check failed, denying elevated privilege");
                false
            }
        }
    }

    /// Insert one role-assignment row per role.
    ///
    /// # Errors
    ///
    /// - `RoleAssignment` if the insert is rejected
    pub async fn assign_roles(
        &self,
        user_id: Uuid,
        roles: &BTreeSet<Role>,
    ) -> Result<(), DomainError> {
        if roles.is_empty() {
            return Ok(());
        }

        let rows: Vec<RoleAssignment> = roles
            .iter()
            .map(|role| RoleAssignment::new(user_id, *role))
            .collect();

        self.identity
            .insert_role_assignments(rows)
            .await
            .map_err(|e| DomainError::RoleAssignment(e.to_string()))
    }

    async fn query_roles(&self, id: Uuid) -> Result<BTreeSet<Role>, DomainError> {
        let rows = self
            .identity
            .select_role_assignments(id)
            .await
            .map_err(|e| DomainError::RoleQuery(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|row| row.user_id == id)
            .filter_map(|row| match row.role.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!(error = %e, "Skipping unrecognized role assignment");
                    None
                }
            })
            .collect())
    }

    async fn query_privilege(&self, id: Uuid) -> Result<bool, DomainError> {
        self.identity
            .has_role(id, self.elevated_role.as_str())
            .await
            .map_err(|e| DomainError::PrivilegeCheck(e.to_string()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::test_support::MockIdentityService;

    fn resolver(mock: &Arc<MockIdentityService>) -> RoleResolver {
        RoleResolver::new(mock.clone(), Role::Admin)
    }

    #[tokio::test]
    async fn fetch_roles_returns_assigned_set() {
        let mock = Arc::new(MockIdentityService::new());
        let id = Uuid::new_v4();
        mock.assign(id, &["volunteer", "donor", "donor"]);

        let roles = resolver(&mock).fetch_roles(Some(id)).await;

        assert_eq!(roles, BTreeSet::from([Role::Volunteer, Role::Donor]));
    }

    #[tokio::test]
    async fn fetch_roles_without_identity_skips_query() {
        let mock = Arc::new(MockIdentityService::new());

        let roles = resolver(&mock).fetch_roles(None).await;

        assert!(roles.is_empty());
        assert_eq!(mock.select_calls(), 0);
    }

    #[tokio::test]
    async fn fetch_roles_without_rows_is_empty() {
        let mock = Arc::new(MockIdentityService::new());

        let roles = resolver(&mock).fetch_roles(Some(Uuid::new_v4())).await;

        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn fetch_roles_fails_open() {
        let mock = Arc::new(MockIdentityService::new());
        let id = Uuid::new_v4();
        mock.assign(id, &["veteran"]);
        mock.fail_role_queries(true);

        let roles = resolver(&mock).fetch_roles(Some(id)).await;

        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn fetch_roles_skips_unknown_names() {
        let mock = Arc::new(MockIdentityService::new());
        let id = Uuid::new_v4();
        mock.assign(id, &["moderator", "veteran"]);

        let roles = resolver(&mock).fetch_roles(Some(id)).await;

        assert_eq!(roles, BTreeSet::from([Role::Veteran]));
    }

    #[tokio::test]
    async fn elevated_privilege_reflects_server_check() {
        let mock = Arc::new(MockIdentityService::new());
        let id = Uuid::new_v4();
        mock.grant_admin(id);

        assert!(resolver(&mock).check_elevated_privilege(Some(id)).await);
        assert!(
            !resolver(&mock)
                .check_elevated_privilege(Some(Uuid::new_v4()))
                .await
        );
    }

    #[tokio::test]
    async fn elevated_privilege_is_independent_of_role_rows() {
        let mock = Arc::new(MockIdentityService::new());
        let id = Uuid::new_v4();
        mock.assign(id, &["admin"]);

        assert!(!resolver(&mock).check_elevated_privilege(Some(id)).await);
    }

    #[tokio::test]
    async fn elevated_privilege_fails_closed() {
        let mock = Arc::new(MockIdentityService::new());
        let id = Uuid::new_v4();
        mock.grant_admin(id);
        mock.fail_privilege_checks(true);

        assert!(!resolver(&mock).check_elevated_privilege(Some(id)).await);
    }

    #[tokio::test]
    async fn assign_roles_with_empty_set_issues_no_insert() {
        let mock = Arc::new(MockIdentityService::new());

        resolver(&mock)
            .assign_roles(Uuid::new_v4(), &BTreeSet::new())
            .await
            .unwrap();

        assert_eq!(mock.insert_calls(), 0);
    }

    #[tokio::test]
    async fn assign_roles_inserts_one_row_per_role() {
        let mock = Arc::new(MockIdentityService::new());
        let id = Uuid::new_v4();

        resolver(&mock)
            .assign_roles(id, &BTreeSet::from([Role::Donor, Role::Veteran]))
            .await
            .unwrap();

        let inserted = mock.inserted_rows();
        assert_eq!(inserted.len(), 2);
        assert!(inserted.iter().all(|row| row.user_id == id));
    }
}
