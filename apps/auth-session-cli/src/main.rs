//! auth-session-cli
//!
//! Drives the auth session manager against the static identity plugin and
//! prints the resulting view as JSON.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use auth_session::AuthSession;
use auth_session_sdk::{AuthSessionClient, AuthView, Identity, Role, SignUpRequest};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;

/// Upper bound on waiting for role resolution before printing the view.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Auth session demo CLI
#[derive(Parser, Debug)]
#[command(name = "auth-session-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); `RUST_LOG` wins when set
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Create an account, optionally selecting roles
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Role to assign (repeatable)
        #[arg(long = "role")]
        roles: Vec<Role>,

        /// Profile field as key=value (repeatable)
        #[arg(long = "profile", value_parser = parse_key_value)]
        profile: Vec<(String, String)>,
    },

    /// Show the bootstrapped session
    Session,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// Printable projection of [`AuthView`]; tokens are never printed.
#[derive(Debug, Serialize)]
struct ViewSummary {
    loading: bool,
    authenticated: bool,
    identity: Option<Identity>,
    roles: Vec<Role>,
    elevated: bool,
    expires_at: Option<u64>,
}

impl From<&AuthView> for ViewSummary {
    fn from(view: &AuthView) -> Self {
        Self {
            loading: view.loading,
            authenticated: view.is_authenticated(),
            identity: view.identity.clone(),
            roles: view.roles.iter().copied().collect(),
            elevated: view.elevated,
            expires_at: view.session.as_ref().and_then(|s| s.expires_at),
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(client: &dyn AuthSessionClient, command: Command) -> Result<()> {
    match command {
        Command::SignIn { email, password } => {
            client
                .sign_in(&email, &password.into())
                .await
                .context("sign-in failed")?;
        }
        Command::Register {
            email,
            password,
            roles,
            profile,
        } => {
            let mut request = SignUpRequest::new(email, password);
            for role in roles {
                request = request.with_role(role);
            }
            for (key, value) in profile {
                request = request.with_profile_field(key, value);
            }
            client.register(request).await.context("registration failed")?;
        }
        Command::Session => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load(cli.config.as_deref())?;
    let identity = static_identity_plugin::init(&cfg.static_identity);
    let auth = AuthSession::start(cfg.auth_session, identity);
    let client = auth.client();

    auth.manager().bootstrapped().await;
    let outcome = run(client.as_ref(), cli.command).await;

    if tokio::time::timeout(SETTLE_TIMEOUT, auth.manager().wait_idle())
        .await
        .is_err()
    {
        warn!(timeout = ?SETTLE_TIMEOUT, "Role resolution still pending");
    }
    let view = client.view();
    auth.stop().await;
    outcome?;

    let summary = serde_json::to_string_pretty(&ViewSummary::from(&view))
        .context("failed to render view")?;
    println!("{summary}");
    info!("Done");
    Ok(())
}
