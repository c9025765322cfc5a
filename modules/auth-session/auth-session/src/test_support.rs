#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use auth_session_sdk::{
    AuthView, Identity, IdentityServiceError, IdentityServicePluginClient, RoleAssignment,
    Session, SessionEvent, SessionListener, SignUpOptions, SignUpOutcome, SubscriptionId,
};
use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::sync::{Notify, oneshot, watch};
use uuid::Uuid;

#[must_use]
pub fn session_for(id: Uuid) -> Session {
    Session::new(
        format!("token-{id}"),
        Identity::new(id, format!("{id}@example.org")),
    )
}

/// Wait (bounded) until the view satisfies `pred`.
pub async fn wait_for_view(
    rx: &mut watch::Receiver<AuthView>,
    pred: impl FnMut(&AuthView) -> bool,
) -> AuthView {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timed out waiting for view")
        .expect("view sender dropped")
        .clone()
}

/// Scriptable identity service.
///
/// Notifications are dispatched while holding the listener lock, like a real
/// client library dispatching under its auth lock. Role and privilege
/// queries can be held back per identity with gates.
#[derive(Default)]
pub struct MockIdentityService {
    listeners: Mutex<HashMap<u64, Arc<dyn SessionListener>>>,
    next_subscription: AtomicU64,

    bootstrap_session: Mutex<Option<Session>>,
    bootstrap_gate: Mutex<Option<oneshot::Receiver<Option<Session>>>>,
    fail_bootstrap: AtomicBool,

    assignments: Mutex<Vec<RoleAssignment>>,
    admins: Mutex<HashSet<Uuid>>,
    role_gates: Mutex<HashMap<Uuid, Arc<Notify>>>,
    privilege_gates: Mutex<HashMap<Uuid, Arc<Notify>>>,
    fail_role_queries: AtomicBool,
    fail_privilege_checks: AtomicBool,
    fail_inserts: AtomicBool,
    fail_sign_out: AtomicBool,

    sign_up_result: Mutex<Option<Result<SignUpOutcome, IdentityServiceError>>>,
    sign_up_options: Mutex<Option<SignUpOptions>>,
    sign_in_result: Mutex<Option<IdentityServiceError>>,

    select_calls: AtomicUsize,
    has_role_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    inserted: Mutex<Vec<RoleAssignment>>,
    updates: Mutex<Vec<(Uuid, String, String)>>,
}

impl MockIdentityService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: SessionEvent, session: Option<Session>) {
        let listeners = self.listeners.lock();
        for listener in listeners.values() {
            listener.on_session_change(event, session.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn set_bootstrap_session(&self, session: Option<Session>) {
        *self.bootstrap_session.lock() = session;
    }

    /// Hold `get_session` until the returned sender supplies its result.
    pub fn gate_bootstrap(&self) -> oneshot::Sender<Option<Session>> {
        let (tx, rx) = oneshot::channel();
        *self.bootstrap_gate.lock() = Some(rx);
        tx
    }

    pub fn fail_bootstrap(&self, fail: bool) {
        self.fail_bootstrap.store(fail, Ordering::SeqCst);
    }

    pub fn assign(&self, user_id: Uuid, roles: &[&str]) {
        let mut rows = self.assignments.lock();
        rows.extend(roles.iter().map(|r| RoleAssignment {
            user_id,
            role: (*r).to_owned(),
        }));
    }

    pub fn grant_admin(&self, user_id: Uuid) {
        self.admins.lock().insert(user_id);
    }

    /// Hold role queries for `user_id` until the returned gate is notified.
    pub fn gate_roles(&self, user_id: Uuid) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.role_gates.lock().insert(user_id, gate.clone());
        gate
    }

    /// Hold privilege checks for `user_id` until the returned gate is notified.
    pub fn gate_privilege(&self, user_id: Uuid) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.privilege_gates.lock().insert(user_id, gate.clone());
        gate
    }

    pub fn fail_role_queries(&self, fail: bool) {
        self.fail_role_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_privilege_checks(&self, fail: bool) {
        self.fail_privilege_checks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn set_sign_up_result(&self, result: Result<SignUpOutcome, IdentityServiceError>) {
        *self.sign_up_result.lock() = Some(result);
    }

    pub fn reject_sign_in(&self, error: IdentityServiceError) {
        *self.sign_in_result.lock() = Some(error);
    }

    pub fn last_sign_up_options(&self) -> Option<SignUpOptions> {
        self.sign_up_options.lock().clone()
    }

    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn has_role_calls(&self) -> usize {
        self.has_role_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    pub fn inserted_rows(&self) -> Vec<RoleAssignment> {
        self.inserted.lock().clone()
    }

    pub fn updates(&self) -> Vec<(Uuid, String, String)> {
        self.updates.lock().clone()
    }

    fn gate(gates: &Mutex<HashMap<Uuid, Arc<Notify>>>, id: Uuid) -> Option<Arc<Notify>> {
        gates.lock().get(&id).cloned()
    }
}

#[async_trait]
impl IdentityServicePluginClient for MockIdentityService {
    fn subscribe(&self, listener: Arc<dyn SessionListener>) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().insert(id, listener);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().remove(&id.0);
    }

    async fn get_session(&self) -> Result<Option<Session>, IdentityServiceError> {
        let gate = self.bootstrap_gate.lock().take();
        if let Some(rx) = gate {
            return Ok(rx.await.unwrap_or(None));
        }
        if self.fail_bootstrap.load(Ordering::SeqCst) {
            return Err(IdentityServiceError::Unavailable("bootstrap".to_owned()));
        }
        Ok(self.bootstrap_session.lock().clone())
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &SecretString,
        options: SignUpOptions,
    ) -> Result<SignUpOutcome, IdentityServiceError> {
        *self.sign_up_options.lock() = Some(options);
        self.sign_up_result.lock().take().unwrap_or_else(|| {
            Ok(SignUpOutcome {
                identity: Some(Identity::new(Uuid::new_v4(), email)),
            })
        })
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &SecretString,
    ) -> Result<(), IdentityServiceError> {
        match self.sign_in_result.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityServiceError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(IdentityServiceError::Unavailable("revoke".to_owned()));
        }
        Ok(())
    }

    async fn has_role(
        &self,
        identity_id: Uuid,
        role_name: &str,
    ) -> Result<bool, IdentityServiceError> {
        self.has_role_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::gate(&self.privilege_gates, identity_id) {
            gate.notified().await;
        }
        if self.fail_privilege_checks.load(Ordering::SeqCst) {
            return Err(IdentityServiceError::Internal("has_role".to_owned()));
        }
        Ok(role_name == "admin" && self.admins.lock().contains(&identity_id))
    }

    async fn select_role_assignments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, IdentityServiceError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = Self::gate(&self.role_gates, user_id) {
            gate.notified().await;
        }
        if self.fail_role_queries.load(Ordering::SeqCst) {
            return Err(IdentityServiceError::Unavailable("user_roles".to_owned()));
        }
        Ok(self
            .assignments
            .lock()
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_role_assignments(
        &self,
        rows: Vec<RoleAssignment>,
    ) -> Result<(), IdentityServiceError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(IdentityServiceError::Internal("insert user_roles".to_owned()));
        }
        self.inserted.lock().extend(rows.iter().cloned());
        self.assignments.lock().extend(rows);
        Ok(())
    }

    async fn update_role_assignment(
        &self,
        user_id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<(), IdentityServiceError> {
        self.updates
            .lock()
            .push((user_id, from.to_owned(), to.to_owned()));
        let mut rows = self.assignments.lock();
        match rows
            .iter_mut()
            .find(|row| row.user_id == user_id && row.role == from)
        {
            Some(row) => {
                to.clone_into(&mut row.role);
                Ok(())
            }
            None => Err(IdentityServiceError::Validation(format!(
                "user does not hold role '{from}'"
            ))),
        }
    }
}
