//! HTTP endpoint handlers.
//!
//! Handlers stay thin: resolve the caller, decode the body, hand off to the
//! dispatcher or [`Services`], and encode the result as JSON.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::ajax::{ActionDispatcher, ActionRequest, Caller};
use crate::services::{
    message_for, MessageKind, Services, SubscribeRequest, SubscribeResponse, SupportRequest,
    SupportResponse,
};
use crate::web::signature::{is_session_auth_enabled, verify_session_token};
use crate::Config;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "mfwb_session";

/// Header carrying the session token for non-browser clients.
pub const SESSION_HEADER: &str = "x-mfwb-session";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<ActionDispatcher>,
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: ActionDispatcher, services: Services) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            services: Arc::new(services),
        }
    }
}

/// Session token from the header, falling back to the cookie.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(token.trim());
    }

    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    cookies.split(';').find_map(|part| {
        let (name, value) = part.trim().split_once('=')?;
        (name == SESSION_COOKIE).then_some(value.trim())
    })
}

/// Identify the caller from its session token.
///
/// Without a configured signing key no caller is authenticated.
pub fn resolve_caller(headers: &HeaderMap, config: &Config) -> Caller {
    if !is_session_auth_enabled(&config.session_signing_key) {
        return Caller::Anonymous;
    }
    let Some(signing_key) = config.session_signing_key.as_deref() else {
        return Caller::Anonymous;
    };

    session_token(headers)
        .and_then(|token| verify_session_token(signing_key, token, config.session_max_age))
        .map(Caller::User)
        .unwrap_or(Caller::Anonymous)
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Settings UI Dispatcher
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AjaxQuery {
    pub action: Option<String>,
}

/// Dispatcher entry point.
///
/// Answers 200 with the action result, or 204 with no body when the request
/// is dropped. The caller is checked before the body is read.
pub async fn ajax(
    State(state): State<AppState>,
    Query(query): Query<AjaxQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let caller = resolve_caller(&headers, &state.config);
    if !caller.is_authenticated() {
        warn!("ajax_unauthenticated_dropped");
        return StatusCode::NO_CONTENT.into_response();
    }

    let payload = if body.is_empty() {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                debug!("ajax_payload_not_object");
                Map::new()
            }
            Err(e) => {
                debug!(error = %e, body_length = body.len(), "ajax_payload_invalid");
                Map::new()
            }
        }
    };

    let request = ActionRequest::from_payload(payload, query.action);
    let action = request.action.clone().unwrap_or_default();

    match state
        .dispatcher
        .dispatch(&caller, request, &*state.services)
        .await
    {
        Some(result) => {
            info!(action = %action, "ajax_response_sent");
            Json(result).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

// =============================================================================
// Public Signup
// =============================================================================

/// Visitor signup endpoint. Open to anonymous callers.
///
/// Always answers 200 with a `{success, data}` payload. A body that does not
/// decode as a signup gets the invalid form message.
pub async fn subscribe(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match serde_json::from_slice::<SubscribeRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, body_length = body.len(), "subscribe_payload_invalid");
            return Json(SubscribeResponse::failure(message_for(MessageKind::InvalidForm, None)))
                .into_response();
        }
    };

    info!(
        post_id = %request.post_id,
        form_id = %request.form_id,
        campaign = %request.form_campaign,
        field_count = request.param.len(),
        "subscribe_received"
    );

    Json(state.services.add_subscriber(request).await).into_response()
}

// =============================================================================
// Support Form
// =============================================================================

/// Support form endpoint. Requires a session.
pub async fn support(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SupportRequest>,
) -> Response {
    if !resolve_caller(&headers, &state.config).is_authenticated() {
        warn!("support_unauthenticated");
        return (StatusCode::UNAUTHORIZED, Json(SupportResponse::failed())).into_response();
    }

    Json(state.services.submit_support(request).await).into_response()
}
