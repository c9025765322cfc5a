//! Configuration for the auth session module.

use auth_session_sdk::Role;
use serde::Deserialize;

/// Configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSessionConfig {
    /// Redirect target forwarded to the identity service on sign-up
    /// (where the email confirmation link lands).
    pub signup_redirect_to: Option<String>,

    /// Role name passed to the server-side `has_role` check when resolving
    /// elevated privilege.
    pub elevated_role: Role,

    /// What `sign_out` reports when the remote revoke call fails.
    pub sign_out_errors: SignOutErrorPolicy,
}

impl Default for AuthSessionConfig {
    fn default() -> Self {
        Self {
            signup_redirect_to: None,
            elevated_role: Role::Admin,
            sign_out_errors: SignOutErrorPolicy::Ignore,
        }
    }
}

/// Handling of remote revoke failures on sign-out.
///
/// Local roles and elevated privilege are cleared in both cases.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignOutErrorPolicy {
    /// Log the failure and report success.
    #[default]
    Ignore,
    /// Return the identity service error to the caller.
    Propagate,
}
