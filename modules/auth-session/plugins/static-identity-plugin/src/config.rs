//! Configuration for the static identity plugin.

use std::collections::HashMap;

use secrecy::SecretString;
use serde::Deserialize;
use uuid::Uuid;

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticIdentityPluginConfig {
    /// Seeded accounts.
    pub users: Vec<UserConfig>,

    /// Email of a seeded user whose session exists at startup.
    pub signed_in: Option<String>,

    /// Make every role-assignment query fail with `Unavailable`.
    pub fail_role_queries: bool,

    /// Make every `has_role` check fail with `Unavailable`.
    pub fail_privilege_checks: bool,
}

/// Seeded account.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    /// Fixed identity id; generated when omitted.
    #[serde(default)]
    pub id: Option<Uuid>,

    pub email: String,

    pub password: SecretString,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Role names stored in the assignment table. Names the client does not
    /// know are kept as-is.
    #[serde(default)]
    pub roles: Vec<String>,
}
