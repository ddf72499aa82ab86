//! Configuration module for environment variable parsing.
//!
//! Reads all configuration from environment variables.

use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::store::Scope;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Directory holding the JSON settings files
    pub settings_dir: PathBuf,

    /// Persistence domain for all options
    pub settings_scope: Scope,

    /// HMAC key for session tokens; without it every caller is anonymous
    pub session_signing_key: Option<String>,

    /// Maximum age in seconds of a session token
    pub session_max_age: u64,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// MailChimp API base override, e.g. a local stub
    pub mailchimp_api_base: Option<String>,

    // =========================================================================
    // Support Mail
    // =========================================================================

    /// Mailgun API key for the support form transport
    pub mailgun_api_key: Option<String>,

    /// Mailgun sending domain
    pub mailgun_domain: Option<String>,

    /// Mailgun API base URL
    pub mailgun_api_base: String,

    /// Recipient of support form messages
    pub support_email_to: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            settings_dir: env::var("SETTINGS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),

            settings_scope: parse_scope("SETTINGS_SCOPE"),

            session_signing_key: non_empty("SESSION_SIGNING_KEY"),

            session_max_age: parse_or("SESSION_MAX_AGE", 86400),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000),

            mailchimp_api_base: non_empty("MAILCHIMP_API_BASE"),

            mailgun_api_key: non_empty("MAILGUN_API_KEY"),

            mailgun_domain: non_empty("MAILGUN_DOMAIN"),

            mailgun_api_base: non_empty("MAILGUN_API_BASE")
                .unwrap_or_else(|| "https://api.mailgun.net/v3".to_string()),

            support_email_to: non_empty("SUPPORT_EMAIL_TO"),
        }
    }

    /// Mailgun credentials when both key and domain are set.
    pub fn mailgun(&self) -> Option<(&str, &str)> {
        match (&self.mailgun_api_key, &self.mailgun_domain) {
            (Some(key), Some(domain)) => Some((key, domain)),
            _ => None,
        }
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

fn parse_scope(name: &str) -> Scope {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return Scope::default(),
    };

    Scope::parse(raw.trim()).unwrap_or_else(|| {
        warn!(env_var = name, value = %raw, "Invalid scope, using default");
        Scope::default()
    })
}

/// A set, non-blank variable.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
