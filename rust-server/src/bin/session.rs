//! MFWB Session - Issue a settings-UI session token.
//!
//! Usage: `mfwb-session <user>`
//!
//! Signs a token for `<user>` with `SESSION_SIGNING_KEY` and prints it on
//! stdout. Send it back as the `mfwb_session` cookie or the
//! `X-MFWB-Session` header.

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mfwb::web::{is_session_auth_enabled, issue_session_token};
use mfwb::Config;

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the token
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
        .init();

    let user = std::env::args()
        .nth(1)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .context("Usage: mfwb-session <user>")?;

    let config = Config::from_env();
    if !is_session_auth_enabled(&config.session_signing_key) {
        bail!("SESSION_SIGNING_KEY is not set");
    }
    let signing_key = config.session_signing_key.unwrap_or_default();

    let token = issue_session_token(&signing_key, &user).context("Failed to sign session token")?;

    info!(user = %user, max_age_seconds = config.session_max_age, "session_token_issued");
    println!("{}", token);

    Ok(())
}
