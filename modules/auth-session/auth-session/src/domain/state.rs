//! Observable view state and its transition rules.
//!
//! All writes go through `watch::Sender::send_modify`/`send_if_modified`,
//! so each write is atomic with respect to readers and to other writes. None
//! of these methods await or call the identity service, which makes them
//! safe to run from inside a session-change callback.

use std::collections::BTreeSet;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use auth_session_sdk::{AuthView, Role, Session};
use tokio::sync::watch;
use uuid::Uuid;

/// Identity and view generation a resolution was issued for.
///
/// A result is applied only while both still match the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionTag {
    pub identity_id: Uuid,
    pub generation: u64,
}

/// Result of applying the bootstrap query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A notification was applied first; the bootstrap result was dropped.
    Superseded,
    /// The bootstrap session became current. Carries the resolution to run.
    Applied(Option<ResolutionTag>),
}

pub struct ViewState {
    view: watch::Sender<AuthView>,
    /// Set by the first applied notification. Read and written only inside
    /// `view`'s modify closures, which serializes it against the bootstrap.
    notified: AtomicBool,
    /// Bumped on every transition, local clear and reissue. Same access
    /// rule as `notified`.
    generation: AtomicU64,
    /// Deferred fetches scheduled but not yet finished.
    in_flight: watch::Sender<usize>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            view: watch::Sender::new(AuthView::default()),
            notified: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            in_flight: watch::Sender::new(0),
        }
    }

    pub fn snapshot(&self) -> AuthView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthView> {
        self.view.subscribe()
    }

    /// Apply a session-change notification.
    ///
    /// Returns the resolution to schedule, if any.
    pub fn apply_notification(&self, session: Option<Session>) -> Option<ResolutionTag> {
        let mut next = None;
        self.view.send_modify(|view| {
            self.notified.store(true, Ordering::SeqCst);
            next = self.issue(transition(view, session));
        });
        next
    }

    /// Apply the bootstrap session unless a notification got there first.
    pub fn apply_bootstrap(&self, session: Option<Session>) -> BootstrapOutcome {
        let mut outcome = BootstrapOutcome::Superseded;
        self.view.send_if_modified(|view| {
            if self.notified.load(Ordering::SeqCst) {
                return false;
            }
            outcome = BootstrapOutcome::Applied(self.issue(transition(view, session)));
            true
        });
        outcome
    }

    /// Start a new generation for the current identity so earlier results
    /// are discarded. With `only_for`, nothing happens unless that identity
    /// is current.
    pub fn reissue(&self, only_for: Option<Uuid>) -> Option<ResolutionTag> {
        let mut tag = None;
        self.view.send_if_modified(|view| {
            let current = view.identity_id();
            if only_for.is_none() || only_for == current {
                tag = self.issue(current);
            }
            false
        });
        tag
    }

    /// Store a role-fetch result issued for `tag`.
    ///
    /// Returns `false` when `tag` is stale and the result was discarded.
    pub fn apply_roles(&self, tag: ResolutionTag, roles: BTreeSet<Role>) -> bool {
        let mut current = true;
        self.view.send_if_modified(|view| {
            if !self.is_current(view, tag) {
                current = false;
                return false;
            }
            if view.roles == roles {
                return false;
            }
            view.roles = roles;
            true
        });
        current
    }

    /// Store a privilege-check result issued for `tag`.
    ///
    /// Same stale-result rule as [`apply_roles`](Self::apply_roles).
    pub fn apply_elevated(&self, tag: ResolutionTag, elevated: bool) -> bool {
        let mut current = true;
        self.view.send_if_modified(|view| {
            if !self.is_current(view, tag) {
                current = false;
                return false;
            }
            if view.elevated == elevated {
                return false;
            }
            view.elevated = elevated;
            true
        });
        current
    }

    /// Drop roles and elevated privilege, keeping identity and session.
    ///
    /// Fetches still in flight become stale.
    pub fn clear_authorization(&self) {
        self.view.send_if_modified(|view| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if view.roles.is_empty() && !view.elevated {
                return false;
            }
            view.roles.clear();
            view.elevated = false;
            true
        });
    }

    pub fn begin_fetches(&self, count: usize) {
        self.in_flight.send_modify(|n| *n += count);
    }

    pub fn finish_fetch(&self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub fn reset_in_flight(&self) {
        self.in_flight.send_replace(0);
    }

    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        if rx.wait_for(|n| *n == 0).await.is_err() {
            tracing::debug!("in-flight counter closed while waiting for idle");
        }
    }

    /// Bump the generation. Call only from inside a `view` modify closure.
    fn issue(&self, identity_id: Option<Uuid>) -> Option<ResolutionTag> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        identity_id.map(|identity_id| ResolutionTag {
            identity_id,
            generation,
        })
    }

    fn is_current(&self, view: &AuthView, tag: ResolutionTag) -> bool {
        view.identity_id() == Some(tag.identity_id)
            && self.generation.load(Ordering::SeqCst) == tag.generation
    }
}

/// Recompute the view for a new session.
///
/// Roles and elevated privilege carry over only when the identity is
/// unchanged (token refresh, profile update); a different identity starts
/// from an empty authorization until its own fetches land.
fn transition(view: &mut AuthView, session: Option<Session>) -> Option<Uuid> {
    let previous = view.identity_id();
    let identity = session.as_ref().map(|s| s.identity.clone());
    let next = identity.as_ref().map(|i| i.id);

    let (roles, elevated) = if next.is_some() && next == previous {
        (mem::take(&mut view.roles), view.elevated)
    } else {
        (BTreeSet::new(), false)
    };

    *view = AuthView {
        identity,
        session,
        loading: false,
        elevated,
        roles,
    };
    next
}
