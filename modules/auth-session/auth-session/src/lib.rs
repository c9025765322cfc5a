//! Auth Session Module
//!
//! Keeps a single in-process view of authentication state, reconciled from
//! the identity service's session-change notifications and a one-shot
//! bootstrap query, and resolves roles and elevated privilege for the
//! current identity.
//!
//! Provides the `AuthSessionClient` implementation handed to consumers by
//! [`module::AuthSession`].
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;
pub mod module;

pub use config::{AuthSessionConfig, SignOutErrorPolicy};
pub use domain::guard::{Access, Requirement};
pub use domain::{RoleResolver, SessionManager};
pub use module::AuthSession;

#[cfg(test)]
mod test_support;
