#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static Identity Service Plugin
//!
//! In-memory identity service for development, demos and tests. Users and
//! their role assignments come from configuration; sign-ups made at runtime
//! live until the process exits.
//!
//! Session-change listeners are invoked while the plugin holds its internal
//! lock, the way hosted identity client libraries dispatch auth events. A
//! listener that calls back into the plugin deadlocks.
//!
//! ## Configuration
//!
//! ```yaml
//! static_identity:
//!   signed_in: "admin@example.org"
//!   users:
//!     - id: "11111111-6a88-4768-9dfc-6bcd5187d9ed"
//!       email: "admin@example.org"
//!       password: "admin"
//!       attributes:
//!         full_name: "Site Admin"
//!       roles: ["admin"]
//!     - email: "vet@example.org"
//!       password: "vet"
//!       roles: ["veteran"]
//!   fail_role_queries: false
//!   fail_privilege_checks: false
//! ```

pub mod config;
pub mod domain;
pub mod module;

pub use config::{StaticIdentityPluginConfig, UserConfig};
pub use domain::Service;
pub use module::init;
