//! Map validated CLI arguments onto the action to run.
//!
//! The admin secret is checked here so a missing, empty or legacy default
//! secret aborts startup instead of silently gating the dashboard with it.

use crate::api::{AdminSecret, Environment};
use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, auth};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or the admin secret is rejected.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let admin_secret = matches
        .get_one::<String>(auth::ARG_ADMIN_SECRET)
        .cloned()
        .context("missing required argument: --admin-secret")?;
    let admin_secret =
        AdminSecret::new(SecretString::from(admin_secret)).context("invalid IPE_ADMIN_SECRET")?;

    let environment = matches
        .get_one::<String>(auth::ARG_ENVIRONMENT)
        .map_or(Ok(Environment::Development), |value| value.parse())
        .map_err(anyhow::Error::msg)?;

    let session_ttl_seconds = matches
        .get_one::<i64>(auth::ARG_SESSION_TTL_SECONDS)
        .copied()
        .unwrap_or(crate::api::DEFAULT_SESSION_TTL_SECONDS);

    let login_path = matches
        .get_one::<String>(auth::ARG_LOGIN_PATH)
        .cloned()
        .unwrap_or_else(|| "/login".to_string());
    if !login_path.starts_with('/') {
        anyhow::bail!("--login-path must be an absolute path, got: {login_path}");
    }

    let login_rate_limit = matches
        .get_one::<bool>(auth::ARG_LOGIN_RATE_LIMIT)
        .copied()
        .unwrap_or(true);

    Ok(Action::Server(Args {
        port,
        admin_secret,
        environment,
        session_ttl_seconds,
        login_path,
        login_rate_limit,
    }))
}
