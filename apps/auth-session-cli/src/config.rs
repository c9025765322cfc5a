//! Layered CLI configuration: optional YAML file, then `AUTH_SESSION__*`
//! environment variables (`__` separates nesting levels).

use std::path::Path;

use anyhow::{Context, bail};
use auth_session::AuthSessionConfig;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;
use static_identity_plugin::StaticIdentityPluginConfig;

pub const ENV_PREFIX: &str = "AUTH_SESSION__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub auth_session: AuthSessionConfig,
    pub static_identity: StaticIdentityPluginConfig,
}

/// Load configuration.
///
/// # Errors
///
/// Fails when `path` does not exist or the merged document does not match
/// [`AppConfig`].
pub fn load(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        if !path.is_file() {
            bail!("config file {} not found", path.display());
        }
        figment = figment.merge(Yaml::file(path));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("invalid configuration")
}
