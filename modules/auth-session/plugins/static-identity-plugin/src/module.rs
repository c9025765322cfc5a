//! Static identity plugin entry point.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::StaticIdentityPluginConfig;
use crate::domain::Service;

/// Build the in-memory identity service from configuration.
#[must_use]
pub fn init(cfg: &StaticIdentityPluginConfig) -> Arc<Service> {
    info!("Initializing static_identity_plugin");
    warn!(
        "Static identity plugin keeps accounts and passwords in memory. \
         Do NOT use it in production."
    );

    info!(
        user_count = cfg.users.len(),
        signed_in = ?cfg.signed_in,
        fail_role_queries = cfg.fail_role_queries,
        fail_privilege_checks = cfg.fail_privilege_checks,
        "Loaded plugin configuration"
    );

    Arc::new(Service::from_config(cfg))
}
