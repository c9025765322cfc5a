//! Auth session manager.
//!
//! Reconciles the identity service's session-change notifications with a
//! one-shot bootstrap query and drives role resolution on every transition.
//!
//! Notifications are handled synchronously inside the identity service's
//! callback: the view is updated in place and a resolution task is pushed
//! onto a queue. The worker draining that queue is the only place that
//! calls back into the identity service, so the callback never re-enters
//! the service while it holds its dispatch lock.

use std::sync::Arc;

use auth_session_sdk::{
    AuthView, IdentityServicePluginClient, Role, Session, SessionEvent, SessionListener,
    SignUpOptions, SignUpRequest, SubscriptionId,
};
use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::DomainError;
use super::role_resolver::RoleResolver;
use super::state::{BootstrapOutcome, ResolutionTag, ViewState};
use crate::config::{AuthSessionConfig, SignOutErrorPolicy};

/// Fetches started per resolution: roles and elevated privilege.
const FETCHES_PER_RESOLUTION: usize = 2;

enum DeferredTask {
    Resolve { tag: ResolutionTag },
}

/// Queue handle shared by the notification listener, the bootstrap task and
/// the manager.
#[derive(Clone)]
struct Scheduler {
    state: Arc<ViewState>,
    tasks: mpsc::UnboundedSender<DeferredTask>,
}

impl Scheduler {
    fn schedule_resolution(&self, tag: ResolutionTag) {
        self.state.begin_fetches(FETCHES_PER_RESOLUTION);
        if self.tasks.send(DeferredTask::Resolve { tag }).is_err() {
            for _ in 0..FETCHES_PER_RESOLUTION {
                self.state.finish_fetch();
            }
            debug!(
                identity_id = %tag.identity_id,
                "Resolution worker stopped, dropping resolution"
            );
        }
    }

    /// Re-resolve the current identity, or only `identity_id` when given.
    fn reschedule(&self, identity_id: Option<Uuid>) {
        if let Some(tag) = self.state.reissue(identity_id) {
            self.schedule_resolution(tag);
        }
    }

    fn handle_transition(&self, session: Option<Session>) {
        if let Some(tag) = self.state.apply_notification(session) {
            self.schedule_resolution(tag);
        }
    }
}

struct TransitionListener {
    scheduler: Scheduler,
}

impl SessionListener for TransitionListener {
    fn on_session_change(&self, event: SessionEvent, session: Option<Session>) {
        debug!(
            ?event,
            identity_id = ?session.as_ref().map(Session::identity_id),
            "Session transition"
        );
        self.scheduler.handle_transition(session);
    }
}

/// Drains the deferred-task queue. Each resolution runs its role fetch and
/// privilege check as two independent tasks.
struct ResolutionWorker {
    state: Arc<ViewState>,
    resolver: Arc<RoleResolver>,
    tasks: mpsc::UnboundedReceiver<DeferredTask>,
    in_flight: JoinSet<()>,
    cancel: CancellationToken,
}

impl ResolutionWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                task = self.tasks.recv() => match task {
                    Some(DeferredTask::Resolve { tag }) => self.spawn_resolution(tag),
                    None => break,
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        warn!(error = %e, "Role resolution task panicked");
                        self.state.finish_fetch();
                    }
                }
            }
        }

        // Later sends fail and undo their own count.
        self.tasks.close();
        self.in_flight.shutdown().await;
        self.state.reset_in_flight();
        debug!("Resolution worker stopped");
    }

    fn spawn_resolution(&mut self, tag: ResolutionTag) {
        let identity_id = tag.identity_id;

        let state = self.state.clone();
        let resolver = self.resolver.clone();
        self.in_flight.spawn(async move {
            let roles = resolver.fetch_roles(Some(identity_id)).await;
            if !state.apply_roles(tag, roles) {
                debug!(
                    %identity_id,
                    generation = tag.generation,
                    "Discarding stale role result"
                );
            }
            state.finish_fetch();
        });

        let state = self.state.clone();
        let resolver = self.resolver.clone();
        self.in_flight.spawn(async move {
            let elevated = resolver.check_elevated_privilege(Some(identity_id)).await;
            if !state.apply_elevated(tag, elevated) {
                debug!(
                    %identity_id,
                    generation = tag.generation,
                    "Discarding stale privilege result"
                );
            }
            state.finish_fetch();
        });
    }
}

/// Single authoritative in-process view of authentication state.
///
/// Created with [`SessionManager::start`] and stopped with
/// [`SessionManager::shutdown`]; every operation after shutdown fails with
/// `Stopped`.
pub struct SessionManager {
    config: AuthSessionConfig,
    identity: Arc<dyn IdentityServicePluginClient>,
    resolver: Arc<RoleResolver>,
    scheduler: Scheduler,
    subscription: SubscriptionId,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
    bootstrap: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Subscribe to session changes, then bootstrap the current session.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    #[tracing::instrument(skip_all, fields(elevated_role = %config.elevated_role))]
    pub fn start(
        config: AuthSessionConfig,
        identity: Arc<dyn IdentityServicePluginClient>,
    ) -> Arc<Self> {
        let state = Arc::new(ViewState::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler { state, tasks: tx };
        let resolver = Arc::new(RoleResolver::new(identity.clone(), config.elevated_role));
        let cancel = CancellationToken::new();

        // Subscribe before bootstrapping so no notification can slip between.
        let subscription = identity.subscribe(Arc::new(TransitionListener {
            scheduler: scheduler.clone(),
        }));
        info!(subscription = subscription.0, "Subscribed to session changes");

        let worker = ResolutionWorker {
            state: scheduler.state.clone(),
            resolver: resolver.clone(),
            tasks: rx,
            in_flight: JoinSet::new(),
            cancel: cancel.clone(),
        };
        let worker = tokio::spawn(worker.run());

        let bootstrap = tokio::spawn(bootstrap_session(identity.clone(), scheduler.clone()));

        Arc::new(Self {
            config,
            identity,
            resolver,
            scheduler,
            subscription,
            cancel,
            worker: Mutex::new(Some(worker)),
            bootstrap: Mutex::new(Some(bootstrap)),
        })
    }

    /// Current snapshot.
    #[must_use]
    pub fn view(&self) -> AuthView {
        self.scheduler.state.snapshot()
    }

    /// Receiver notified on every view change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthView> {
        self.scheduler.state.subscribe()
    }

    /// Wait for the bootstrap query to finish (applied or superseded).
    pub async fn bootstrapped(&self) {
        let handle = self.bootstrap.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Bootstrap task did not complete");
        }
    }

    /// Wait until every scheduled role and privilege fetch has finished.
    pub async fn wait_idle(&self) {
        self.scheduler.state.wait_idle().await;
    }

    /// Create an account and assign the selected roles.
    ///
    /// Role assignment is best effort: a failed insert is logged and the
    /// registration still succeeds.
    ///
    /// # Errors
    ///
    /// - `IdentityService` if account creation fails
    /// - `Stopped` after shutdown
    #[tracing::instrument(skip_all, fields(email = %request.email, roles = request.roles.len()))]
    pub async fn register(&self, request: SignUpRequest) -> Result<(), DomainError> {
        self.ensure_running()?;

        let options = SignUpOptions {
            redirect_to: self.config.signup_redirect_to.clone(),
            data: request.profile,
        };
        let outcome = self
            .identity
            .sign_up(&request.email, &request.password, options)
            .await?;

        if request.roles.is_empty() {
            return Ok(());
        }

        let Some(identity) = outcome.identity else {
            warn!("Sign-up returned no identity, selected roles were not assigned");
            return Ok(());
        };

        match self.resolver.assign_roles(identity.id, &request.roles).await {
            Ok(()) => {
                info!(identity_id = %identity.id, "Assigned selected roles");
                // Resolved at sign-in, before these rows existed.
                self.scheduler.reschedule(Some(identity.id));
            }
            Err(e) => warn!(
                identity_id = %identity.id,
                error = %e,
                "Role assignment failed, registration kept"
            ),
        }

        Ok(())
    }

    /// Verify credentials. The view follows through the notification path.
    ///
    /// # Errors
    ///
    /// - `IdentityService` if the credentials are rejected
    /// - `Stopped` after shutdown
    #[tracing::instrument(skip_all, fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), DomainError> {
        self.ensure_running()?;
        self.identity.sign_in_with_password(email, password).await?;
        debug!("Credentials accepted");
        Ok(())
    }

    /// Revoke the session remotely, then clear roles and elevated privilege
    /// locally whatever the remote outcome. Fetches still in flight for the
    /// signed-out session are discarded.
    ///
    /// # Errors
    ///
    /// - `IdentityService` if the revoke failed and the policy is `Propagate`
    /// - `Stopped` after shutdown
    #[tracing::instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<(), DomainError> {
        self.ensure_running()?;

        let remote = self.identity.sign_out().await;
        self.scheduler.state.clear_authorization();

        match remote {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Remote sign-out failed, local authorization cleared");
                match self.config.sign_out_errors {
                    SignOutErrorPolicy::Ignore => Ok(()),
                    SignOutErrorPolicy::Propagate => Err(e.into()),
                }
            }
        }
    }

    /// Re-run resolution for the current identity. No-op when signed out.
    ///
    /// # Errors
    ///
    /// - `Stopped` after shutdown
    pub fn refresh_roles(&self) -> Result<(), DomainError> {
        self.ensure_running()?;
        self.scheduler.reschedule(None);
        Ok(())
    }

    /// Replace role `from` with `to` for `user_id`.
    ///
    /// Gated on the locally cached elevated flag; the identity service
    /// enforces its own policy on the update.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the current view is not elevated
    /// - `IdentityService` if the update is rejected
    /// - `Stopped` after shutdown
    #[tracing::instrument(skip_all, fields(%user_id, %from, %to))]
    pub async fn change_role(&self, user_id: Uuid, from: Role, to: Role) -> Result<(), DomainError> {
        self.ensure_running()?;

        if !self.view().elevated {
            return Err(DomainError::forbidden(
                "changing roles requires elevated privilege",
            ));
        }

        self.identity
            .update_role_assignment(user_id, from.as_str(), to.as_str())
            .await?;
        info!("Role assignment updated");

        self.scheduler.reschedule(Some(user_id));
        Ok(())
    }

    /// Unsubscribe, stop the worker and abort in-flight fetches.
    pub async fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.identity.unsubscribe(self.subscription);
        self.cancel.cancel();

        let bootstrap = self.bootstrap.lock().take();
        if let Some(handle) = bootstrap {
            handle.abort();
        }

        let worker = self.worker.lock().take();
        if let Some(handle) = worker
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Resolution worker did not stop cleanly");
        }
        info!("Auth session manager stopped");
    }

    fn ensure_running(&self) -> Result<(), DomainError> {
        if self.cancel.is_cancelled() {
            return Err(DomainError::Stopped);
        }
        Ok(())
    }
}

async fn bootstrap_session(identity: Arc<dyn IdentityServicePluginClient>, scheduler: Scheduler) {
    let session = match identity.get_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "Bootstrap session query failed, assuming no session");
            None
        }
    };

    match scheduler.state.apply_bootstrap(session) {
        BootstrapOutcome::Superseded => {
            debug!("Bootstrap result superseded by a session notification");
        }
        BootstrapOutcome::Applied(Some(tag)) => {
            info!(identity_id = %tag.identity_id, "Bootstrapped existing session");
            scheduler.schedule_resolution(tag);
        }
        BootstrapOutcome::Applied(None) => info!("Bootstrapped without a session"),
    }
}
