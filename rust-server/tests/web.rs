use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use mfwb::ajax::{ActionDispatcher, TracingHook};
use mfwb::mail::DisabledTransport;
use mfwb::mailer::{AccountData, ServiceCategory, ServiceDescriptor, ServiceError};
use mfwb::web::{issue_session_token, router};
use mfwb::{
    AppState, Campaign, Config, DocumentStore, JsonFileStore, MailerDirectory, Options, Registry,
    Scope, ServiceHandler, Services,
};

const SIGNING_KEY: &str = "integration-key";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Provider stand-in that accepts every key and records signups.
#[derive(Default)]
struct StubMailer {
    signups: Mutex<Vec<Value>>,
}

#[async_trait]
impl ServiceHandler for StubMailer {
    async fn connect(&self, fields: &Map<String, Value>) -> Result<AccountData, ServiceError> {
        match fields.get("api_key").and_then(Value::as_str) {
            Some(key) if !key.is_empty() => {
                let mut data = AccountData::new();
                data.insert("api_key".to_string(), json!(key));
                Ok(data)
            }
            _ => Err(ServiceError::InvalidApiKey),
        }
    }

    fn render_connect_settings(&self) -> String {
        r#"<input name="api_key" />"#.to_string()
    }

    async fn render_fields(
        &self,
        _account: &AccountData,
        _settings: &Map<String, Value>,
    ) -> Result<String, ServiceError> {
        Ok(r#"<select name="list_id"></select>"#.to_string())
    }

    async fn subscribe(
        &self,
        _account: &AccountData,
        _campaign: &Campaign,
        fields: &Map<String, Value>,
    ) -> Result<(), ServiceError> {
        self.signups.lock().unwrap().push(Value::Object(fields.clone()));
        Ok(())
    }
}

fn app(dir: &TempDir, mailer: Arc<StubMailer>) -> axum::Router {
    let mut config = Config::from_env();
    config.settings_dir = dir.path().to_path_buf();
    config.settings_scope = Scope::Site;
    config.session_signing_key = Some(SIGNING_KEY.to_string());
    config.session_max_age = 300;
    config.support_email_to = Some("support@example.com".to_string());

    let store = JsonFileStore::open(dir.path()).unwrap();
    let options = Options::new(Arc::new(store), Scope::Site);

    let mut directory = MailerDirectory::new();
    directory.register(ServiceDescriptor::new(
        "mailchimp",
        "MailChimp",
        ServiceCategory::Autoresponder,
        mailer,
    ));

    let services = Services::new(
        directory,
        Registry::new(options.clone()),
        DocumentStore::new(options),
        Arc::new(DisabledTransport),
        config.support_email_to.clone(),
    );

    let mut dispatcher = ActionDispatcher::with_default_actions();
    dispatcher.add_hook(Arc::new(TracingHook));

    router(AppState::new(config, dispatcher, services))
}

fn session() -> String {
    issue_session_token(SIGNING_KEY, "editor").unwrap()
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("cookie", format!("mfwb_session={}", token));
    }
    let req = builder
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Send a POST request with a raw body and return (status, parsed JSON body).
async fn post_raw(
    app: axum::Router,
    uri: &str,
    content_type: &str,
    body: &'static str,
) -> (StatusCode, Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(axum::body::Body::from(body))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok() {
    let dir = TempDir::new().unwrap();
    let req = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app(&dir, Arc::default()).oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"status": "ok"}));
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ajax_without_session_is_dropped() {
    let dir = TempDir::new().unwrap();
    let body = json!({
        "action": "save_mailer_campaign",
        "campaign_name": "launch",
        "campaign_data": {"service": "mailchimp", "account": "acct1"}
    });

    let (status, json) = post_json(app(&dir, Arc::default()), "/ajax", None, body.clone()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(json, Value::Null);

    let (status, _) = post_json(app(&dir, Arc::default()), "/ajax", Some("editor.1.bad"), body).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(!dir.path().join("site.json").exists());
}

#[tokio::test]
async fn ajax_unknown_or_missing_action_is_dropped() {
    let dir = TempDir::new().unwrap();
    let token = session();

    let (status, _) = post_json(app(&dir, Arc::default()), "/ajax", Some(token.as_str()), json!({"action": "drop"})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = post_json(app(&dir, Arc::default()), "/ajax", Some(token.as_str()), json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn ajax_action_from_query() {
    let dir = TempDir::new().unwrap();
    let token = session();

    let (status, json) = post_json(
        app(&dir, Arc::default()),
        "/ajax?action=save_mailer_campaign",
        Some(token.as_str()),
        json!({"campaign_name": "launch", "campaign_data": {"service": "mailchimp", "account": "acct1"}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"error": false}));
}

#[tokio::test]
async fn ajax_campaign_name_collision() {
    let dir = TempDir::new().unwrap();
    let token = session();
    let create = |list: &str| {
        json!({
            "action": "save_mailer_campaign",
            "campaign_name": "launch",
            "campaign_data": {"service": "mailchimp", "account": "acct1", "settings": {"list_id": list}}
        })
    };

    let (_, first) = post_json(app(&dir, Arc::default()), "/ajax", Some(token.as_str()), create("l1")).await;
    let (_, second) = post_json(app(&dir, Arc::default()), "/ajax", Some(token.as_str()), create("l2")).await;

    assert_eq!(first, json!({"error": false}));
    assert_eq!(second, json!({"error": "Campaign name is already exists."}));

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("site.json")).unwrap()).unwrap();
    assert_eq!(saved["mailer_campaigns"]["launch"]["settings"]["list_id"], json!("l1"));
}

#[tokio::test]
async fn ajax_connect_then_render_accounts() {
    let dir = TempDir::new().unwrap();
    let token = session();
    let connect = json!({
        "action": "connect_service",
        "service": "mailchimp",
        "fields": {"service_account": "acct1", "api_key": "abc-us1"}
    });

    let (status, json) = post_json(app(&dir, Arc::default()), "/ajax", Some(token.as_str()), connect.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], json!(false));
    assert!(json["html"].as_str().unwrap().contains(r#"<option value="acct1" selected>acct1</option>"#));

    let (_, dup) = post_json(app(&dir, Arc::default()), "/ajax", Some(token.as_str()), connect).await;
    assert_eq!(dup["error"], json!("Error: An account with that name already exists."));

    let (_, render) = post_json(
        app(&dir, Arc::default()),
        "/ajax",
        Some(token.as_str()),
        json!({"action": "render_service_settings", "service": "mailchimp"}),
    )
    .await;
    assert!(render["html"].as_str().unwrap().contains("Add Account..."));

    let (_, deleted) = post_json(
        app(&dir, Arc::default()),
        "/ajax",
        Some(token.as_str()),
        json!({"action": "delete_service_account", "service": "mailchimp", "account": "acct1"}),
    )
    .await;
    assert_eq!(deleted, json!({"error": false}));

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("site.json")).unwrap()).unwrap();
    assert_eq!(saved["mailer_services"], json!({}));
}

// ---------------------------------------------------------------------------
// Signup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribe_end_to_end() {
    let dir = TempDir::new().unwrap();
    let token = session();
    let mailer = Arc::new(StubMailer::default());

    let setup = [
        json!({
            "action": "save_builder_document",
            "post_id": 42,
            "elements": [{"id": "section", "elements": [
                {"id": "f2", "settings": {"form_fields": [{"name": "email"}]}}
            ]}]
        }),
        json!({
            "action": "connect_service",
            "service": "mailchimp",
            "fields": {"service_account": "acct1", "api_key": "abc-us1"}
        }),
        json!({
            "action": "save_mailer_campaign",
            "campaign_name": "launch",
            "campaign_data": {"service": "mailchimp", "account": "acct1", "settings": {"list_id": "l1"}}
        }),
    ];
    for body in setup {
        let (status, json) = post_json(app(&dir, mailer.clone()), "/ajax", Some(token.as_str()), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["error"], json!(false));
    }

    let (status, json) = post_json(
        app(&dir, mailer.clone()),
        "/subscribe",
        None,
        json!({
            "post_id": "42",
            "form_id": "f2",
            "form_campaign": "launch",
            "param": {"email": "visitor@example.com"}
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"success": true, "data": {"message": "The message was sent successfully!", "link": ""}})
    );
    assert_eq!(
        *mailer.signups.lock().unwrap(),
        vec![json!({"email": "visitor@example.com"})]
    );
}

#[tokio::test]
async fn subscribe_unknown_form() {
    let dir = TempDir::new().unwrap();

    let (status, json) = post_json(
        app(&dir, Arc::default()),
        "/subscribe",
        None,
        json!({"post_id": 1, "form_id": "nope", "form_campaign": "launch", "param": {}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"success": false, "data": {"message": "Something went wrong... Please set mailer."}})
    );
}

#[tokio::test]
async fn subscribe_empty_param_list() {
    let dir = TempDir::new().unwrap();

    let (status, json) = post_json(
        app(&dir, Arc::default()),
        "/subscribe",
        None,
        json!({"post_id": 1, "form_id": "nope", "form_campaign": "launch", "param": []}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"success": false, "data": {"message": "Something went wrong... Please set mailer."}})
    );
}

#[tokio::test]
async fn subscribe_undecodable_body() {
    let dir = TempDir::new().unwrap();
    let invalid_form =
        json!({"success": false, "data": {"message": "Something went wrong... Please set mailer."}});
    let mailer = Arc::new(StubMailer::default());

    let bodies = [
        ("application/json", "{ not json"),
        ("application/json", r#"{"form_id": "f2", "param": ["visitor@example.com"]}"#),
        ("application/x-www-form-urlencoded", "post_id=1&form_id=f2&form_campaign=launch"),
        ("text/plain", ""),
    ];
    for (content_type, body) in bodies {
        let (status, json) = post_raw(app(&dir, mailer.clone()), "/subscribe", content_type, body).await;
        assert_eq!(status, StatusCode::OK, "{} {:?}", content_type, body);
        assert_eq!(json, invalid_form, "{} {:?}", content_type, body);
    }
    assert!(mailer.signups.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Support
// ---------------------------------------------------------------------------

#[tokio::test]
async fn support_requires_session() {
    let dir = TempDir::new().unwrap();
    let body = json!({"email": "ada@example.com", "name": "Ada", "subject": "bug", "message": "hi"});

    let (status, json) = post_json(app(&dir, Arc::default()), "/support", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], json!(false));

    // No transport configured: accepted for processing but reported as failed.
    let (status, json) = post_json(app(&dir, Arc::default()), "/support", Some(session().as_str()), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": false, "data": {"msg": "Something went wrong!"}}));
}
