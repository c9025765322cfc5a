//! Auth Session SDK
//!
//! This crate provides the public API for the `auth_session` module:
//!
//! - [`AuthSessionClient`] - Public API trait for consumers (routers, guarded pages)
//! - [`IdentityServicePluginClient`] - Contract of the hosted identity service
//! - [`SessionListener`] - Callback receiving session-change notifications
//! - [`AuthView`] - Observable authentication snapshot
//! - [`AuthSessionError`] / [`IdentityServiceError`] - Error types
//!
//! ## Usage
//!
//! Consumers hold the client and read or watch the view:
//!
//! ```ignore
//! use auth_session_sdk::AuthSessionClient;
//!
//! let view = auth.view();
//! if view.elevated {
//!     // render admin dashboard
//! }
//!
//! let mut changes = auth.subscribe();
//! changes.changed().await?;
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod plugin_api;

// Re-export main types at crate root
pub use api::AuthSessionClient;
pub use error::{AuthSessionError, IdentityServiceError, UnknownRole};
pub use models::{
    AuthView, Identity, Role, RoleAssignment, Session, SessionEvent, SignUpOptions,
    SignUpOutcome, SignUpRequest,
};
pub use plugin_api::{IdentityServicePluginClient, SessionListener, SubscriptionId};
