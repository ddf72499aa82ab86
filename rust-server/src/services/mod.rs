//! Operations behind the dispatcher actions and the public endpoints.
//!
//! ## Processing Flow
//!
//! ```text
//! ActionHandler + positional args → Services::execute() → ActionResponse JSON
//! SubscribeRequest → Services::add_subscriber() → SubscribeResponse
//! SupportRequest → Services::submit_support() → SupportResponse
//! ```

pub mod messages;
pub mod settings;
pub mod subscribe;
pub mod support;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use tracing::error;

use crate::ajax::{ActionExecutor, ActionHandler};
use crate::forms::DocumentStore;
use crate::mail::MailTransport;
use crate::mailer::MailerDirectory;
use crate::registry::Registry;
use crate::store::StoreError;

pub use messages::{message_for, MessageKind};
pub use subscribe::{SubscribeData, SubscribeRequest, SubscribeResponse};
pub use support::{SupportData, SupportRequest, SupportResponse};

/// Result payload of a settings-UI action: `{ "error": false | "...", "html": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    #[serde(serialize_with = "error_or_false")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

fn error_or_false<S: Serializer>(error: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(message) => serializer.serialize_str(message),
        None => serializer.serialize_bool(false),
    }
}

impl ActionResponse {
    /// Success without markup.
    pub fn ok() -> Self {
        Self { error: None, html: None }
    }

    /// Success carrying markup.
    pub fn rendered(html: String) -> Self {
        Self {
            error: None,
            html: Some(html),
        }
    }

    /// Failure without markup.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            html: None,
        }
    }

    /// Failure of a rendering action; `html` stays present but empty.
    pub fn failed_render(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            html: Some(String::new()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Shown when the settings store cannot be read or written.
pub const STORAGE_ERROR: &str = "Error: Could not access saved settings.";

fn storage_failed(e: StoreError, render: bool) -> ActionResponse {
    error!(error = %e, "settings_store_failed");
    if render {
        ActionResponse::failed_render(STORAGE_ERROR)
    } else {
        ActionResponse::failed(STORAGE_ERROR)
    }
}

/// Everything the handlers need, built once at startup.
pub struct Services {
    directory: MailerDirectory,
    registry: Registry,
    documents: DocumentStore,
    transport: Arc<dyn MailTransport>,
    support_to: Option<String>,
}

impl Services {
    pub fn new(
        directory: MailerDirectory,
        registry: Registry,
        documents: DocumentStore,
        transport: Arc<dyn MailTransport>,
        support_to: Option<String>,
    ) -> Self {
        Self {
            directory,
            registry,
            documents,
            transport,
            support_to,
        }
    }

    pub fn directory(&self) -> &MailerDirectory {
        &self.directory
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }
}

#[async_trait]
impl ActionExecutor for Services {
    async fn execute(&self, handler: ActionHandler, args: Vec<Option<Value>>) -> Value {
        let mut args = args.into_iter();
        let mut next = || args.next().flatten();

        let response = match handler {
            ActionHandler::RenderServiceSettings => {
                let (service, add_new) = (next(), next());
                self.render_settings(service, add_new).await
            }
            ActionHandler::RenderServiceFields => {
                let (service, account) = (next(), next());
                self.render_fields(service, account).await
            }
            ActionHandler::ConnectService => {
                let (service, fields) = (next(), next());
                self.connect_service(service, fields).await
            }
            ActionHandler::DeleteServiceAccount => {
                let (service, account) = (next(), next());
                self.delete_account(service, account)
            }
            ActionHandler::SaveCampaign => {
                let (name, data) = (next(), next());
                self.save_campaign(name, data)
            }
            ActionHandler::DeleteCampaign => self.delete_campaign(next()),
            ActionHandler::SaveBuilderDocument => {
                let (post_id, elements) = (next(), next());
                self.save_document(post_id, elements)
            }
        };

        serde_json::to_value(&response).unwrap_or_else(|e| {
            error!(error = %e, "action_response_encode_failed");
            json!({ "error": STORAGE_ERROR })
        })
    }
}
