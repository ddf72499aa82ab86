//! Settings-UI operations: accounts, campaigns and builder documents.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{storage_failed, ActionResponse, Services};
use crate::forms::{value_as_id, Element};
use crate::html::{render_settings_field, FieldConfig};
use crate::mailer::ServiceHandler;
use crate::registry::{Campaign, RegistryError};
use crate::store::StoreError;
use crate::util::sanitize_text_field;

/// Trimmed, non-empty string argument.
fn str_arg(value: &Option<Value>) -> Option<&str> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Decode an object argument that may also arrive as a JSON string.
fn object_arg(value: Option<Value>) -> Option<Value> {
    match value? {
        Value::String(raw) => serde_json::from_str(&raw).ok(),
        Value::Null => None,
        other => Some(other),
    }
}

impl Services {
    /// Validate credentials with the provider and store the new account.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// service, fields, account name, known service, duplicate account.
    /// A duplicate never reaches the provider.
    pub async fn connect_service(&self, service: Option<Value>, fields: Option<Value>) -> ActionResponse {
        let Some(service) = str_arg(&service) else {
            return ActionResponse::failed_render("Error: Missing service type.");
        };

        let fields = match object_arg(fields) {
            Some(Value::Object(map)) if !map.is_empty() => map,
            _ => return ActionResponse::failed_render("Error: Missing service data."),
        };

        let account = fields
            .get("service_account")
            .and_then(Value::as_str)
            .map(sanitize_text_field)
            .filter(|a| !a.is_empty());
        let Some(account) = account else {
            return ActionResponse::failed_render("Error: Missing account name.");
        };

        let Some(handler) = self.directory.handler(service) else {
            warn!(service = %service, "connect_unknown_service");
            return ActionResponse::failed_render("Error: Unknown service.");
        };

        match self.registry.has_account(service, &account) {
            Ok(true) => {
                info!(service = %service, account = %account, "connect_duplicate_account");
                return ActionResponse::failed_render(RegistryError::AccountExists.to_string());
            }
            Ok(false) => {}
            Err(e) => return storage_failed(e, true),
        }

        let data = match handler.connect(&fields).await {
            Ok(data) => data,
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "connect_rejected");
                return ActionResponse::failed_render(e.to_string());
            }
        };

        if let Err(e) = self.registry.save_account(service, &account, data) {
            return storage_failed(e, true);
        }

        info!(service = %service, account = %account, "connect_complete");

        match self.render_account_settings(service, handler.as_ref(), &account).await {
            Ok(html) => ActionResponse::rendered(html),
            Err(e) => storage_failed(e, true),
        }
    }

    /// Connection form for a new account, or the account select when the
    /// service already has accounts and `add_new` is not set.
    pub async fn render_settings(&self, service: Option<Value>, add_new: Option<Value>) -> ActionResponse {
        let Some(service) = str_arg(&service) else {
            return ActionResponse::failed_render("Error: Missing service type.");
        };
        let Some(handler) = self.directory.handler(service) else {
            return ActionResponse::failed_render("Error: Unknown service.");
        };

        let add_new = matches!(add_new, Some(ref v) if !v.is_null());
        let has_accounts = match self.registry.account_names(service) {
            Ok(names) => !names.is_empty(),
            Err(e) => return storage_failed(e, true),
        };

        if add_new || !has_accounts {
            return ActionResponse::rendered(self.render_connect_settings(handler.as_ref()));
        }

        match self.render_account_settings(service, handler.as_ref(), "").await {
            Ok(html) => ActionResponse::rendered(html),
            Err(e) => storage_failed(e, true),
        }
    }

    /// Account name field, provider connection fields and the connect button.
    pub fn render_connect_settings(&self, handler: &dyn ServiceHandler) -> String {
        let mut html = render_settings_field(
            "service_account",
            &FieldConfig::text("Account Name")
                .class("sjea-service-connect-input")
                .row_class("sjea-service-connect-row")
                .help("Used to identify this connection within the accounts list and can be anything you like."),
        );
        html.push_str(&handler.render_connect_settings());
        html.push_str(&render_settings_field(
            "service_connect_button",
            &FieldConfig::button("Connect")
                .class("sjea-service-connect-button")
                .row_class("sjea-service-connect-row"),
        ));
        html
    }

    /// Account select with `active` preselected, followed by the provider's
    /// campaign fields when `active` is a stored account.
    pub async fn render_account_settings(
        &self,
        service: &str,
        handler: &dyn ServiceHandler,
        active: &str,
    ) -> Result<String, StoreError> {
        let names = self.registry.account_names(service)?;

        let options = std::iter::once((String::new(), "Choose...".to_string()))
            .chain(names.into_iter().map(|n| (n.clone(), n)))
            .chain(std::iter::once((
                "add_new_account".to_string(),
                "Add Account...".to_string(),
            )));

        let mut html = render_settings_field(
            "service_account",
            &FieldConfig::select("Account", options)
                .class("sjea-service-account-select")
                .row_class("sjea-service-account-row")
                .default_value(active),
        );

        if active.is_empty() {
            return Ok(html);
        }

        if let Some(data) = self.registry.account(service, active)? {
            match handler.render_fields(&data, &Map::new()).await {
                Ok(fields) => html.push_str(&fields),
                Err(e) => debug!(service = %service, account = %active, error = %e, "account_fields_unavailable"),
            }
        }

        Ok(html)
    }

    /// Provider campaign fields for a stored account.
    pub async fn render_fields(&self, service: Option<Value>, account: Option<Value>) -> ActionResponse {
        let Some(service) = str_arg(&service) else {
            return ActionResponse::failed_render("Error: Missing service type.");
        };
        let Some(handler) = self.directory.handler(service) else {
            return ActionResponse::failed_render("Error: Unknown service.");
        };
        let Some(account) = str_arg(&account) else {
            return ActionResponse::failed_render("Error: Missing account name.");
        };

        let data = match self.registry.account(service, account) {
            Ok(Some(data)) => data,
            Ok(None) => return ActionResponse::failed_render("Error: Account not found."),
            Err(e) => return storage_failed(e, true),
        };

        match handler.render_fields(&data, &Map::new()).await {
            Ok(html) => ActionResponse::rendered(html),
            Err(e) => ActionResponse::failed_render(e.to_string()),
        }
    }

    /// Remove a stored account. Missing arguments or accounts are a no-op.
    pub fn delete_account(&self, service: Option<Value>, account: Option<Value>) -> ActionResponse {
        let (Some(service), Some(account)) = (str_arg(&service), str_arg(&account)) else {
            return ActionResponse::ok();
        };

        match self.registry.delete_account(service, account) {
            Ok(()) => ActionResponse::ok(),
            Err(e) => storage_failed(e, false),
        }
    }

    /// Create a campaign. An existing name is reported, never overwritten.
    pub fn save_campaign(&self, name: Option<Value>, data: Option<Value>) -> ActionResponse {
        let Some(name) = str_arg(&name).map(sanitize_text_field).filter(|n| !n.is_empty()) else {
            return ActionResponse::failed("Error: Missing campaign name.");
        };

        let campaign: Campaign = match object_arg(data).map(serde_json::from_value) {
            Some(Ok(campaign)) => campaign,
            Some(Err(e)) => {
                debug!(campaign = %name, error = %e, "campaign_data_invalid");
                return ActionResponse::failed("Error: Invalid campaign data.");
            }
            None => return ActionResponse::failed("Error: Invalid campaign data."),
        };

        match self.registry.create_campaign(&name, campaign) {
            Ok(()) => ActionResponse::ok(),
            Err(RegistryError::Store(e)) => storage_failed(e, false),
            Err(e) => ActionResponse::failed(e.to_string()),
        }
    }

    /// Remove a campaign. Missing names are a no-op.
    pub fn delete_campaign(&self, name: Option<Value>) -> ActionResponse {
        let Some(name) = str_arg(&name) else {
            return ActionResponse::ok();
        };

        match self.registry.delete_campaign(name) {
            Ok(()) => ActionResponse::ok(),
            Err(e) => storage_failed(e, false),
        }
    }

    /// Store the element tree of one builder page.
    pub fn save_document(&self, post_id: Option<Value>, elements: Option<Value>) -> ActionResponse {
        let Some(post_id) = post_id.as_ref().and_then(value_as_id) else {
            return ActionResponse::failed("Error: Missing post id.");
        };

        let elements: Vec<Element> = match object_arg(elements).map(serde_json::from_value) {
            Some(Ok(elements)) => elements,
            _ => return ActionResponse::failed("Error: Invalid builder document."),
        };

        match self.documents.save(&post_id, &elements) {
            Ok(()) => ActionResponse::ok(),
            Err(e) => storage_failed(e, false),
        }
    }
}
