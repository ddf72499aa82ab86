//! MailChimp Marketing API (v3) handler.
//!
//! API keys carry their datacenter as a suffix (`<key>-us6`), which selects
//! the API host `https://us6.api.mailchimp.com/3.0`. Requests use HTTP basic
//! auth with the key as the password.
//! Reference: https://mailchimp.com/developer/marketing/api/

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use url::Url;

use super::{AccountData, ServiceError, ServiceHandler};
use crate::html::{render_settings_field, FieldConfig};
use crate::registry::Campaign;
use crate::util::sanitize_email;

/// Service id of this provider in the mailer directory.
pub const SERVICE_ID: &str = "mailchimp";

/// Upper bound on lists offered in the campaign settings.
const LIST_PAGE_SIZE: &str = "100";

/// MailChimp problem-detail error body.
#[derive(Debug, Default, Deserialize)]
struct ApiProblem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
}

impl ApiProblem {
    fn message(&self, status: u16) -> String {
        if !self.detail.is_empty() {
            self.detail.clone()
        } else if !self.title.is_empty() {
            self.title.clone()
        } else {
            format!("Unexpected response status {}.", status)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListsResponse {
    #[serde(default)]
    lists: Vec<MailingList>,
}

#[derive(Debug, Deserialize)]
struct MailingList {
    id: String,
    name: String,
}

/// MailChimp service handler.
#[derive(Clone)]
pub struct MailChimp {
    client: Client,
    /// Fixed API base, bypassing datacenter routing
    api_base: Option<String>,
}

impl MailChimp {
    pub fn new(client: Client, api_base: Option<String>) -> Self {
        Self { client, api_base }
    }

    fn base_url(&self, api_key: &str) -> Result<String, ServiceError> {
        let datacenter = datacenter(api_key).ok_or(ServiceError::InvalidApiKey)?;

        Ok(match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.mailchimp.com/3.0", datacenter),
        })
    }
}

/// `base` with `segments` appended, each percent-encoded as one path segment.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ServiceError> {
    let mut url = Url::parse(base).map_err(|_| ServiceError::InvalidEndpoint)?;
    url.path_segments_mut()
        .map_err(|_| ServiceError::InvalidEndpoint)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Extract the datacenter suffix from an API key.
fn datacenter(api_key: &str) -> Option<&str> {
    let (key, dc) = api_key.trim().rsplit_once('-')?;
    if key.is_empty() || dc.is_empty() || !dc.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(dc)
}

fn string_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "true" | "1" | "yes" | "on"),
        Some(Value::Number(n)) => n.as_i64().map_or(false, |n| n != 0),
        _ => false,
    }
}

async fn read_problem(resp: Response) -> (u16, ApiProblem) {
    let status = resp.status().as_u16();
    let problem = resp.json::<ApiProblem>().await.unwrap_or_default();
    (status, problem)
}

#[async_trait]
impl ServiceHandler for MailChimp {
    async fn connect(&self, fields: &Map<String, Value>) -> Result<AccountData, ServiceError> {
        let api_key = string_field(fields, "api_key").ok_or(ServiceError::InvalidApiKey)?;
        let base = self.base_url(api_key)?;

        info!(base = %base, "mailchimp_connect_start");

        let resp = self
            .client
            .get(endpoint(&base, &["ping"])?)
            .basic_auth("mfwb", Some(api_key))
            .send()
            .await?;

        if !resp.status().is_success() {
            let (status, problem) = read_problem(resp).await;
            warn!(status_code = status, title = %problem.title, "mailchimp_connect_rejected");
            return Err(ServiceError::Unauthorized(problem.message(status)));
        }

        info!("mailchimp_connect_complete");

        let mut data = AccountData::new();
        data.insert("api_key".to_string(), Value::String(api_key.to_string()));
        Ok(data)
    }

    fn render_connect_settings(&self) -> String {
        render_settings_field(
            "api_key",
            &FieldConfig::text("API Key")
                .class("sjea-service-connect-input")
                .row_class("sjea-service-connect-row")
                .help("Your API key can be found in your MailChimp account under Account > Extras > API Keys."),
        )
    }

    async fn render_fields(
        &self,
        account: &AccountData,
        settings: &Map<String, Value>,
    ) -> Result<String, ServiceError> {
        let api_key = string_field(account, "api_key").ok_or(ServiceError::InvalidApiKey)?;
        let base = self.base_url(api_key)?;

        let resp = self
            .client
            .get(endpoint(&base, &["lists"])?)
            .query(&[("count", LIST_PAGE_SIZE), ("fields", "lists.id,lists.name")])
            .basic_auth("mfwb", Some(api_key))
            .send()
            .await?;

        if !resp.status().is_success() {
            let (status, problem) = read_problem(resp).await;
            warn!(status_code = status, title = %problem.title, "mailchimp_lists_rejected");
            return Err(ServiceError::Rejected(problem.message(status)));
        }

        let lists: ListsResponse = resp.json().await?;
        info!(list_count = lists.lists.len(), "mailchimp_lists_fetched");

        let options = std::iter::once((String::new(), "Choose...".to_string()))
            .chain(lists.lists.into_iter().map(|l| (l.id, l.name)));

        let mut list_select = FieldConfig::select("List", options)
            .class("sjea-service-list-select")
            .row_class("sjea-service-list-row");
        if let Some(selected) = string_field(settings, "list_id") {
            list_select = list_select.default_value(selected);
        }

        let mut html = render_settings_field("list_id", &list_select);
        html.push_str(&render_settings_field(
            "double_optin",
            &FieldConfig::checkbox("Enable Double Opt-in").class("sjea-service-double-optin"),
        ));

        Ok(html)
    }

    async fn subscribe(
        &self,
        account: &AccountData,
        campaign: &Campaign,
        fields: &Map<String, Value>,
    ) -> Result<(), ServiceError> {
        let list_id = string_field(&campaign.settings, "list_id").ok_or(ServiceError::MissingList)?;
        let email = string_field(fields, "email")
            .and_then(sanitize_email)
            .ok_or(ServiceError::InvalidEmail)?;
        let api_key = string_field(account, "api_key").ok_or(ServiceError::InvalidApiKey)?;
        let base = self.base_url(api_key)?;

        let status = if is_truthy(campaign.settings.get("double_optin")) {
            "pending"
        } else {
            "subscribed"
        };

        let mut merge_fields = Map::new();
        for (field, tag) in [("first_name", "FNAME"), ("last_name", "LNAME")] {
            if let Some(value) = string_field(fields, field) {
                merge_fields.insert(tag.to_string(), Value::String(value.to_string()));
            }
        }

        info!(list_id = %list_id, status = status, "mailchimp_subscribe_start");

        let resp = self
            .client
            .post(endpoint(&base, &["lists", list_id, "members"])?)
            .basic_auth("mfwb", Some(api_key))
            .json(&json!({
                "email_address": email,
                "status": status,
                "merge_fields": merge_fields,
            }))
            .send()
            .await?;

        if resp.status().is_success() {
            info!(list_id = %list_id, "mailchimp_subscribe_complete");
            return Ok(());
        }

        let (status_code, problem) = read_problem(resp).await;
        if problem.title == "Member Exists" {
            info!(list_id = %list_id, "mailchimp_subscribe_already_member");
            return Ok(());
        }

        warn!(
            list_id = %list_id,
            status_code = status_code,
            title = %problem.title,
            "mailchimp_subscribe_rejected"
        );
        Err(ServiceError::Rejected(problem.message(status_code)))
    }
}
