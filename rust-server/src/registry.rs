//! Connected accounts and campaigns.
//!
//! Two options hold everything:
//! - `mailer_services`: service id → account name → account data
//! - `mailer_campaigns`: campaign name → { service, account, settings }
//!
//! Each mutation reads the whole option, changes it and writes it back.
//! Account and campaign names are keyed by their sanitized form, on writes
//! and lookups alike.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::mailer::AccountData;
use crate::store::{Options, StoreError};
use crate::util::sanitize_text_field;

/// Option key of the connected accounts collection.
pub const SERVICES_OPTION: &str = "mailer_services";

/// Option key of the campaigns collection.
pub const CAMPAIGNS_OPTION: &str = "mailer_campaigns";

/// Connected accounts grouped by service id.
pub type ServiceAccounts = BTreeMap<String, BTreeMap<String, AccountData>>;

/// A named binding of service, account and list settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub service: String,
    pub account: String,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Error: An account with that name already exists.")]
    AccountExists,

    #[error("Campaign name is already exists.")]
    CampaignExists,

    #[error("Mailer campaign is deleted from list. Please check mailer campaign configuration.")]
    CampaignMissing,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Account and campaign storage over the settings store.
#[derive(Clone)]
pub struct Registry {
    options: Options,
}

impl Registry {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Every connected account, grouped by service.
    pub fn services(&self) -> Result<ServiceAccounts, StoreError> {
        self.options.get_or_default(SERVICES_OPTION)
    }

    /// Account names connected for one service, in stored order.
    pub fn account_names(&self, service: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .services()?
            .remove(service)
            .map(|accounts| accounts.into_keys().collect())
            .unwrap_or_default())
    }

    pub fn account(&self, service: &str, account: &str) -> Result<Option<AccountData>, StoreError> {
        let account = sanitize_text_field(account);
        Ok(self
            .services()?
            .get_mut(service)
            .and_then(|accounts| accounts.remove(&account)))
    }

    pub fn has_account(&self, service: &str, account: &str) -> Result<bool, StoreError> {
        Ok(self.account(service, account)?.is_some())
    }

    /// Store account data, replacing an existing account of the same name.
    pub fn save_account(&self, service: &str, account: &str, data: AccountData) -> Result<(), StoreError> {
        let account = sanitize_text_field(account);
        let mut services = self.services()?;
        services
            .entry(service.to_string())
            .or_default()
            .insert(account.clone(), data);
        self.options.put(SERVICES_OPTION, &services)?;

        info!(service = %service, account = %account, "mailer_account_saved");
        Ok(())
    }

    /// Remove an account. A service left without accounts is removed too.
    pub fn delete_account(&self, service: &str, account: &str) -> Result<(), StoreError> {
        let account = sanitize_text_field(account);
        let mut services = self.services()?;

        let Some(accounts) = services.get_mut(service) else {
            return Ok(());
        };
        if accounts.remove(&account).is_none() {
            return Ok(());
        }
        if accounts.is_empty() {
            services.remove(service);
        }

        self.options.put(SERVICES_OPTION, &services)?;

        info!(service = %service, account = %account, "mailer_account_deleted");
        Ok(())
    }

    pub fn campaigns(&self) -> Result<BTreeMap<String, Campaign>, StoreError> {
        self.options.get_or_default(CAMPAIGNS_OPTION)
    }

    /// Look up a campaign, failing with [`RegistryError::CampaignMissing`]
    /// when it no longer exists.
    pub fn campaign(&self, name: &str) -> Result<Campaign, RegistryError> {
        self.campaigns()?
            .remove(&sanitize_text_field(name))
            .ok_or(RegistryError::CampaignMissing)
    }

    /// Create a campaign. Existing campaigns are never overwritten.
    pub fn create_campaign(&self, name: &str, campaign: Campaign) -> Result<(), RegistryError> {
        let name = sanitize_text_field(name);
        let mut campaigns = self.campaigns()?;

        if campaigns.contains_key(&name) {
            return Err(RegistryError::CampaignExists);
        }

        info!(
            campaign = %name,
            service = %campaign.service,
            account = %campaign.account,
            "mailer_campaign_created"
        );

        campaigns.insert(name, campaign);
        self.options.put(CAMPAIGNS_OPTION, &campaigns)?;
        Ok(())
    }

    pub fn delete_campaign(&self, name: &str) -> Result<(), StoreError> {
        let name = sanitize_text_field(name);
        let mut campaigns = self.campaigns()?;
        if campaigns.remove(&name).is_none() {
            return Ok(());
        }
        self.options.put(CAMPAIGNS_OPTION, &campaigns)?;

        info!(campaign = %name, "mailer_campaign_deleted");
        Ok(())
    }
}
