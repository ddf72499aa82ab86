//! MFWB Server - Mailing-list form block backend.
//!
//! This binary serves:
//! - The settings UI dispatcher (accounts, campaigns, builder documents)
//! - Public visitor signups into the connected mailing lists
//! - The support contact form
//!
//! All settings live in JSON files under `SETTINGS_DIR`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mfwb::ajax::{ActionDispatcher, TracingHook};
use mfwb::mail::{DisabledTransport, MailTransport, MailgunTransport};
use mfwb::web::{is_session_auth_enabled, router};
use mfwb::{AppState, Config, DocumentStore, JsonFileStore, MailerDirectory, Options, Registry, Services};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        settings_dir = %config.settings_dir.display(),
        settings_scope = config.settings_scope.as_str(),
        session_auth_configured = is_session_auth_enabled(&config.session_signing_key),
        mailgun_configured = config.mailgun().is_some(),
        support_email_configured = config.support_email_to.is_some(),
        "config_loaded"
    );

    if !is_session_auth_enabled(&config.session_signing_key) {
        warn!("session_signing_key_missing_settings_ui_disabled");
    }

    let client = Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Failed to create HTTP client")?;

    let store = JsonFileStore::open(&config.settings_dir).context("Failed to open settings store")?;
    let options = Options::new(Arc::new(store), config.settings_scope);

    let transport: Arc<dyn MailTransport> = match config.mailgun() {
        Some((api_key, domain)) => Arc::new(MailgunTransport::new(
            client.clone(),
            config.mailgun_api_base.clone(),
            domain.to_string(),
            api_key.to_string(),
        )),
        None => {
            warn!("mailgun_not_configured_support_mail_disabled");
            Arc::new(DisabledTransport)
        }
    };

    let services = Services::new(
        MailerDirectory::with_defaults(client, config.mailchimp_api_base.clone()),
        Registry::new(options.clone()),
        DocumentStore::new(options),
        transport,
        config.support_email_to.clone(),
    );

    let mut dispatcher = ActionDispatcher::with_default_actions();
    dispatcher.add_hook(Arc::new(TracingHook));

    let port = config.port;
    let app = router(AppState::new(config, dispatcher, services));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_install_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_install_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
