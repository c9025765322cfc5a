//! Domain layer for the auth session module.

pub mod error;
pub mod guard;
pub mod local_client;
pub mod manager;
pub mod role_resolver;
mod state;

pub use error::DomainError;
pub use local_client::AuthSessionLocalClient;
pub use manager::SessionManager;
pub use role_resolver::RoleResolver;
