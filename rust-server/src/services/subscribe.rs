//! Visitor signups from a rendered builder form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::messages::{message_for, MessageKind};
use super::Services;
use crate::forms::{find_element, value_as_id, Element};
use crate::registry::RegistryError;

/// Signup posted by a visitor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    /// Page holding the form
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub post_id: String,
    /// Element id of the form inside the page
    pub form_id: String,
    /// Campaign the form is bound to
    pub form_campaign: String,
    /// Visitor field values keyed by field name
    #[serde(deserialize_with = "fields_from_object_or_empty")]
    pub param: Map<String, Value>,
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_id(&value).unwrap_or_default())
}

/// Field values as an object. `null` and `[]` (an empty object serialized
/// as a list) decode to no fields.
fn fields_from_object_or_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Array(items) if items.is_empty() => Ok(Map::new()),
        other => Err(serde::de::Error::invalid_type(
            serde::de::Unexpected::Other(json_kind(&other)),
            &"an object of field values",
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "non-empty list",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// `{ "success": bool, "data": { "message": "...", "link": "" } }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub data: SubscribeData,
}

impl SubscribeResponse {
    fn success(message: String) -> Self {
        Self {
            success: true,
            data: SubscribeData {
                message,
                link: Some(String::new()),
            },
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            success: false,
            data: SubscribeData { message, link: None },
        }
    }
}

impl Services {
    /// Push one visitor into the list of the form's campaign.
    pub async fn add_subscriber(&self, request: SubscribeRequest) -> SubscribeResponse {
        let elements = match self.documents.load(&request.post_id) {
            Ok(elements) => elements.unwrap_or_default(),
            Err(e) => {
                error!(post_id = %request.post_id, error = %e, "subscribe_document_load_failed");
                return SubscribeResponse::failure(message_for(MessageKind::ServerError, None));
            }
        };

        let form = find_element(&elements, &request.form_id);
        let Some(form) = form.filter(|_| !request.form_campaign.trim().is_empty()) else {
            warn!(post_id = %request.post_id, form_id = %request.form_id, "subscribe_invalid_form");
            let settings = form.map(|f| &f.settings);
            return SubscribeResponse::failure(message_for(MessageKind::InvalidForm, settings));
        };

        let form = match form.template() {
            Some(template_id) => match self.template_form(template_id) {
                Some(template) => template,
                None => {
                    warn!(template_id = %template_id, "subscribe_template_missing");
                    return SubscribeResponse::failure(message_for(
                        MessageKind::InvalidForm,
                        Some(&form.settings),
                    ));
                }
            },
            None => form.clone(),
        };
        let settings = &form.settings;

        if form.form_fields().is_none() {
            warn!(form_id = %request.form_id, "subscribe_form_without_fields");
            return SubscribeResponse::failure(message_for(MessageKind::InvalidForm, Some(settings)));
        }

        let campaign = match self.registry.campaign(request.form_campaign.trim()) {
            Ok(campaign) => campaign,
            Err(e @ RegistryError::CampaignMissing) => {
                warn!(campaign = %request.form_campaign, "subscribe_campaign_missing");
                return SubscribeResponse::failure(e.to_string());
            }
            Err(e) => {
                error!(campaign = %request.form_campaign, error = %e, "subscribe_campaign_load_failed");
                return SubscribeResponse::failure(message_for(MessageKind::ServerError, Some(settings)));
            }
        };

        let Some(handler) = self.directory.handler(&campaign.service) else {
            error!(service = %campaign.service, "subscribe_unknown_service");
            return SubscribeResponse::failure(message_for(MessageKind::ServerError, Some(settings)));
        };

        let account = match self.registry.account(&campaign.service, &campaign.account) {
            Ok(Some(account)) => account,
            Ok(None) => {
                error!(service = %campaign.service, account = %campaign.account, "subscribe_account_missing");
                return SubscribeResponse::failure(message_for(MessageKind::ServerError, Some(settings)));
            }
            Err(e) => {
                error!(error = %e, "subscribe_account_load_failed");
                return SubscribeResponse::failure(message_for(MessageKind::ServerError, Some(settings)));
            }
        };

        if let Err(e) = handler.subscribe(&account, &campaign, &request.param).await {
            warn!(
                campaign = %request.form_campaign,
                service = %campaign.service,
                error = %e,
                "subscribe_rejected"
            );
            return SubscribeResponse::failure(e.to_string());
        }

        info!(
            post_id = %request.post_id,
            form_id = %request.form_id,
            campaign = %request.form_campaign,
            "subscribe_complete"
        );
        SubscribeResponse::success(message_for(MessageKind::Success, Some(settings)))
    }

    /// First element of a saved template document.
    fn template_form(&self, template_id: &str) -> Option<Element> {
        match self.documents.load(template_id) {
            Ok(elements) => elements.and_then(|e| e.into_iter().next()),
            Err(e) => {
                error!(template_id = %template_id, error = %e, "subscribe_template_load_failed");
                None
            }
        }
    }
}
