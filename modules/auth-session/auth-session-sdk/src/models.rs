//! Domain models for the auth session module.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownRole;

/// Authenticated user as cached from the identity service.
///
/// The identity service stays the source of truth; this is a copy taken at
/// the last session transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    /// Free-form profile metadata (e.g. `full_name`).
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Identity {
    #[must_use]
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Bearer credential bound to an [`Identity`].
///
/// Expiry and refresh are handled entirely by the identity service. Tokens
/// are wrapped in `SecretString` so `Debug` redacts them.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Expiry as unix seconds, when the service reports one.
    pub expires_at: Option<u64>,
    pub identity: Identity,
}

impl Session {
    #[must_use]
    pub fn new(access_token: impl Into<SecretString>, identity: Identity) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            identity,
        }
    }

    #[must_use]
    pub fn identity_id(&self) -> Uuid {
        self.identity.id
    }
}

/// Authorization tag assigned to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Veteran,
    Volunteer,
    Donor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Veteran, Role::Volunteer, Role::Donor, Role::Admin];

    /// Name used in the role-assignment collection and the `has_role` check.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Veteran => "veteran",
            Role::Volunteer => "volunteer",
            Role::Donor => "donor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}

/// One row of the role-assignment collection.
///
/// The role is kept as the stored string: the collection may hold values
/// this client does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role: String,
}

impl RoleAssignment {
    #[must_use]
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            role: role.as_str().to_owned(),
        }
    }
}

/// Kind of session change pushed by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Externally observable authentication snapshot.
///
/// `loading == false` means the identity is known, not that roles are.
/// When `identity` is `None`, `roles` is empty and `elevated` is `false`.
#[derive(Debug, Clone)]
pub struct AuthView {
    pub identity: Option<Identity>,
    pub session: Option<Session>,
    pub loading: bool,
    pub elevated: bool,
    pub roles: BTreeSet<Role>,
}

impl Default for AuthView {
    fn default() -> Self {
        Self {
            identity: None,
            session: None,
            loading: true,
            elevated: false,
            roles: BTreeSet::new(),
        }
    }
}

impl AuthView {
    #[must_use]
    pub fn identity_id(&self) -> Option<Uuid> {
        self.identity.as_ref().map(|i| i.id)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Options forwarded to the identity service on sign-up.
#[derive(Debug, Clone, Default)]
pub struct SignUpOptions {
    /// Where the confirmation link should send the user.
    pub redirect_to: Option<String>,
    /// Profile metadata stored on the created identity.
    pub data: HashMap<String, serde_json::Value>,
}

/// Result of a sign-up call.
///
/// `identity` is `None` when the service accepted the request but did not
/// create the account synchronously (e.g. pending email confirmation).
#[derive(Debug, Clone, Default)]
pub struct SignUpOutcome {
    pub identity: Option<Identity>,
}

/// Registration input accepted by [`AuthSessionClient::register`](crate::AuthSessionClient::register).
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: SecretString,
    pub profile: HashMap<String, serde_json::Value>,
    pub roles: BTreeSet<Role>,
}

impl SignUpRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            profile: HashMap::new(),
            roles: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    #[must_use]
    pub fn with_profile_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }
}
