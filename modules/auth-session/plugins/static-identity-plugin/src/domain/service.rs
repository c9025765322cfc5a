//! In-memory identity service.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use auth_session_sdk::{
    Identity, IdentityServiceError, RoleAssignment, Session, SessionEvent, SessionListener,
    SignUpOptions, SignUpOutcome, SubscriptionId,
};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StaticIdentityPluginConfig;

/// Lifetime reported on issued sessions.
const SESSION_TTL_SECS: u64 = 3600;

struct Account {
    identity: Identity,
    password: SecretString,
}

struct Inner {
    /// Accounts keyed by email.
    accounts: HashMap<String, Account>,
    assignments: Vec<RoleAssignment>,
    current: Option<Session>,
    listeners: BTreeMap<u64, Arc<dyn SessionListener>>,
    next_subscription: u64,
}

impl Inner {
    /// Invoke every listener. Runs with the service lock held.
    fn dispatch(&self, event: SessionEvent) {
        debug!(?event, listeners = self.listeners.len(), "Dispatching session event");
        for listener in self.listeners.values() {
            listener.on_session_change(event, self.current.clone());
        }
    }

    fn account_by_id(&self, id: Uuid) -> Option<&Account> {
        self.accounts.values().find(|a| a.identity.id == id)
    }
}

/// Static identity service.
///
/// All state lives behind one lock; session events are dispatched while that
/// lock is held.
pub struct Service {
    inner: Mutex<Inner>,
    fail_role_queries: bool,
    fail_privilege_checks: bool,
}

impl Service {
    /// Create a service from plugin configuration.
    #[must_use]
    pub fn from_config(cfg: &StaticIdentityPluginConfig) -> Self {
        let mut accounts = HashMap::new();
        let mut assignments = Vec::new();

        for user in &cfg.users {
            let id = user.id.unwrap_or_else(Uuid::new_v4);
            let mut identity = Identity::new(id, user.email.clone());
            identity.attributes.clone_from(&user.attributes);

            assignments.extend(user.roles.iter().map(|role| RoleAssignment {
                user_id: id,
                role: role.clone(),
            }));
            if accounts
                .insert(
                    user.email.clone(),
                    Account {
                        identity,
                        password: user.password.clone(),
                    },
                )
                .is_some()
            {
                warn!(email = %user.email, "Duplicate seeded user, keeping the last entry");
            }
        }

        let current = cfg.signed_in.as_deref().and_then(|email| {
            let session = accounts
                .get(email)
                .map(|account| issue_session(account.identity.clone()));
            if session.is_none() {
                warn!(email, "Configured signed-in user is not seeded, starting signed out");
            }
            session
        });

        Self {
            inner: Mutex::new(Inner {
                accounts,
                assignments,
                current,
                listeners: BTreeMap::new(),
                next_subscription: 0,
            }),
            fail_role_queries: cfg.fail_role_queries,
            fail_privilege_checks: cfg.fail_privilege_checks,
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn SessionListener>) -> SubscriptionId {
        let mut inner = self.inner.lock();
        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.listeners.insert(id, listener);
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.inner.lock().listeners.remove(&id.0).is_none() {
            debug!(subscription = id.0, "Unsubscribe for unknown listener");
        }
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.inner.lock().current.clone()
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// - `Validation` for an email without `@` or an empty password
    /// - `AlreadyRegistered` if the email is taken
    pub fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        options: SignUpOptions,
    ) -> Result<SignUpOutcome, IdentityServiceError> {
        if !email.contains('@') {
            return Err(IdentityServiceError::Validation(format!(
                "invalid email address '{email}'"
            )));
        }
        if password.expose_secret().is_empty() {
            return Err(IdentityServiceError::Validation(
                "password must not be empty".to_owned(),
            ));
        }

        let mut inner = self.inner.lock();
        if inner.accounts.contains_key(email) {
            return Err(IdentityServiceError::AlreadyRegistered);
        }

        let mut identity = Identity::new(Uuid::new_v4(), email);
        identity.attributes = options.data;
        inner.accounts.insert(
            email.to_owned(),
            Account {
                identity: identity.clone(),
                password: password.clone(),
            },
        );
        info!(
            identity_id = %identity.id,
            redirect_to = ?options.redirect_to,
            "Account created"
        );

        inner.current = Some(issue_session(identity.clone()));
        inner.dispatch(SessionEvent::SignedIn);

        Ok(SignUpOutcome {
            identity: Some(identity),
        })
    }

    /// # Errors
    ///
    /// - `InvalidCredentials` for an unknown email or wrong password
    pub fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), IdentityServiceError> {
        let mut inner = self.inner.lock();
        let identity = match inner.accounts.get(email) {
            Some(account) if account.password.expose_secret() == password.expose_secret() => {
                account.identity.clone()
            }
            _ => return Err(IdentityServiceError::InvalidCredentials),
        };

        debug!(identity_id = %identity.id, "Password accepted");
        inner.current = Some(issue_session(identity));
        inner.dispatch(SessionEvent::SignedIn);
        Ok(())
    }

    /// End the current session. No event when already signed out.
    pub fn sign_out(&self) {
        let mut inner = self.inner.lock();
        if inner.current.take().is_some() {
            inner.dispatch(SessionEvent::SignedOut);
        }
    }

    /// Rotate the current session's tokens.
    ///
    /// Returns `false` when nobody is signed in.
    #[must_use]
    pub fn refresh_session(&self) -> bool {
        let mut inner = self.inner.lock();
        let Some(identity) = inner.current.as_ref().map(|s| s.identity.clone()) else {
            return false;
        };
        inner.current = Some(issue_session(identity));
        inner.dispatch(SessionEvent::TokenRefreshed);
        true
    }

    /// # Errors
    ///
    /// - `Unavailable` when privilege checks are configured to fail
    pub fn has_role(&self, identity_id: Uuid, role_name: &str) -> Result<bool, IdentityServiceError> {
        if self.fail_privilege_checks {
            return Err(IdentityServiceError::Unavailable(
                "privilege check disabled by configuration".to_owned(),
            ));
        }
        Ok(self
            .inner
            .lock()
            .assignments
            .iter()
            .any(|row| row.user_id == identity_id && row.role == role_name))
    }

    /// # Errors
    ///
    /// - `Unavailable` when role queries are configured to fail
    pub fn select_role_assignments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, IdentityServiceError> {
        if self.fail_role_queries {
            return Err(IdentityServiceError::Unavailable(
                "role query disabled by configuration".to_owned(),
            ));
        }
        Ok(self
            .inner
            .lock()
            .assignments
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    /// Insert rows; rows already present are skipped.
    ///
    /// # Errors
    ///
    /// - `Validation` if a row references an unknown user (nothing inserted)
    pub fn insert_role_assignments(
        &self,
        rows: Vec<RoleAssignment>,
    ) -> Result<(), IdentityServiceError> {
        let mut inner = self.inner.lock();
        if let Some(row) = rows.iter().find(|r| inner.account_by_id(r.user_id).is_none()) {
            return Err(IdentityServiceError::Validation(format!(
                "unknown user {}",
                row.user_id
            )));
        }
        for row in rows {
            if !inner.assignments.contains(&row) {
                inner.assignments.push(row);
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// - `Validation` if `user_id` does not hold `from`
    pub fn update_role_assignment(
        &self,
        user_id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<(), IdentityServiceError> {
        let mut inner = self.inner.lock();
        let Some(pos) = inner
            .assignments
            .iter()
            .position(|row| row.user_id == user_id && row.role == from)
        else {
            return Err(IdentityServiceError::Validation(format!(
                "user {user_id} does not hold role '{from}'"
            )));
        };

        let already_held = inner
            .assignments
            .iter()
            .any(|row| row.user_id == user_id && row.role == to);
        if already_held {
            inner.assignments.remove(pos);
        } else {
            to.clone_into(&mut inner.assignments[pos].role);
        }
        Ok(())
    }
}

fn issue_session(identity: Identity) -> Session {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let mut session = Session::new(format!("static-{}", Uuid::new_v4()), identity);
    session.refresh_token = Some(SecretString::from(format!("refresh-{}", Uuid::new_v4())));
    session.expires_at = Some(now + SESSION_TTL_SECS);
    session
}
