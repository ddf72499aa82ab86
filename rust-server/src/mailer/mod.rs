//! Mailer service catalog and the handler seam for each provider.
//!
//! ## Flow
//!
//! ```text
//! service id → MailerDirectory → ServiceDescriptor → dyn ServiceHandler
//! ```

pub mod mailchimp;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::registry::Campaign;

pub use mailchimp::MailChimp;

/// Opaque provider-specific account data returned by [`ServiceHandler::connect`].
pub type AccountData = Map<String, Value>;

/// Category of a mailer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Autoresponder,
}

/// Errors raised by a service handler.
///
/// The `Display` text is shown to the editor or visitor as-is.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Error: Invalid API key.")]
    InvalidApiKey,

    #[error("Error: Please check your API key. {0}")]
    Unauthorized(String),

    #[error("Error: Please enter a valid email address.")]
    InvalidEmail,

    #[error("Error: No list is selected for this campaign.")]
    MissingList,

    #[error("Error: {0}")]
    Rejected(String),

    #[error("Error: Invalid mailer API address.")]
    InvalidEndpoint,

    #[error("Error: Could not reach the mailer service. {0}")]
    Http(#[from] reqwest::Error),
}

/// Capability set every mailer provider implements.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Exchange submitted credentials for account data worth storing.
    async fn connect(&self, fields: &Map<String, Value>) -> Result<AccountData, ServiceError>;

    /// Markup for the provider-specific connection fields.
    fn render_connect_settings(&self) -> String;

    /// Markup for the per-campaign settings of a connected account.
    async fn render_fields(
        &self,
        account: &AccountData,
        settings: &Map<String, Value>,
    ) -> Result<String, ServiceError>;

    /// Add a visitor to the campaign's list.
    async fn subscribe(
        &self,
        account: &AccountData,
        campaign: &Campaign,
        fields: &Map<String, Value>,
    ) -> Result<(), ServiceError>;
}

/// Catalog entry for one mailer service.
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub id: String,
    pub display_name: String,
    pub category: ServiceCategory,
    pub handler: Arc<dyn ServiceHandler>,
}

impl ServiceDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: ServiceCategory,
        handler: Arc<dyn ServiceHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
            handler,
        }
    }
}

/// Ordered, immutable-after-startup catalog of mailer services.
#[derive(Clone, Default)]
pub struct MailerDirectory {
    services: Vec<ServiceDescriptor>,
}

impl MailerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every shipped provider.
    pub fn with_defaults(client: Client, mailchimp_api_base: Option<String>) -> Self {
        let mut directory = Self::new();
        directory.register(ServiceDescriptor::new(
            mailchimp::SERVICE_ID,
            "MailChimp",
            ServiceCategory::Autoresponder,
            Arc::new(MailChimp::new(client, mailchimp_api_base)),
        ));
        directory
    }

    /// Add a service, replacing any entry with the same id.
    pub fn register(&mut self, descriptor: ServiceDescriptor) {
        info!(
            service = %descriptor.id,
            display_name = %descriptor.display_name,
            "mailer_service_registered"
        );
        self.services.retain(|s| s.id != descriptor.id);
        self.services.push(descriptor);
    }

    pub fn get(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn handler(&self, id: &str) -> Option<Arc<dyn ServiceHandler>> {
        self.get(id).map(|s| s.handler.clone())
    }

    /// All services, or only those of `category`.
    pub fn services(&self, category: Option<ServiceCategory>) -> Vec<&ServiceDescriptor> {
        self.services
            .iter()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .collect()
    }
}
