//! Route guarding over an [`AuthView`].
//!
//! Routers and guarded pages evaluate the current view against a
//! [`Requirement`]. While the view is loading the answer is `Pending`, so
//! callers can hold rendering instead of redirecting too early. Roles may
//! still be in flight after loading ends; role-based requirements then read
//! `Forbidden` until the fetch lands and the view changes again.

use std::collections::BTreeSet;

use auth_session_sdk::{AuthView, Role};

/// What a guarded route needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in identity.
    Authenticated,
    /// At least one of the listed roles.
    AnyRole(BTreeSet<Role>),
    /// Server-verified elevated privilege.
    Elevated,
}

impl Requirement {
    #[must_use]
    pub fn any_role(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::AnyRole(roles.into_iter().collect())
    }

    /// Evaluate the requirement against a view.
    #[must_use]
    pub fn evaluate(&self, view: &AuthView) -> Access {
        if view.loading {
            return Access::Pending;
        }
        if !view.is_authenticated() {
            return Access::Unauthenticated;
        }

        let allowed = match self {
            Self::Authenticated => true,
            Self::AnyRole(roles) => !view.roles.is_disjoint(roles),
            Self::Elevated => view.elevated,
        };

        if allowed {
            Access::Allowed
        } else {
            Access::Forbidden
        }
    }
}

/// Guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Identity not known yet.
    Pending,
    /// No signed-in identity; redirect to sign-in.
    Unauthenticated,
    /// Signed in but missing the required role or privilege.
    Forbidden,
    Allowed,
}

impl Access {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}
