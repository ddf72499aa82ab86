//! HTTP surface of the server.
//!
//! - `POST /ajax`: settings-UI actions through the dispatcher (session required)
//! - `POST /subscribe`: public visitor signup
//! - `POST /support`: support contact form (session required)
//! - `GET /health`: liveness

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    ajax, health, resolve_caller, subscribe, support, AjaxQuery, AppState, HealthResponse,
    SESSION_COOKIE, SESSION_HEADER,
};
pub use signature::{
    is_session_auth_enabled, issue_session_token, sign_session, verify_session_token,
};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ajax", post(ajax))
        .route("/subscribe", post(subscribe))
        .route("/support", post(support))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
