//! Option storage for persisted settings.
//!
//! Settings are keyed JSON values living in one of two persistence domains:
//! the single site, or the whole network of sites. Two backends ship:
//! - [`MemoryStore`]: process-local, used by tests
//! - [`JsonFileStore`]: one JSON document per domain on disk
//!
//! Read-modify-write of a whole option is not guarded across requests;
//! concurrent writers of the same option race and the last write wins.

pub mod file;
pub mod memory;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Persistence domain of an option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Site,
    Network,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Site => "site",
            Scope::Network => "network",
        }
    }

    /// Parse a scope name, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "site" => Some(Scope::Site),
            "network" => Some(Scope::Network),
            _ => None,
        }
    }
}

/// Errors raised by a settings backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings store lock poisoned")]
    Poisoned,
}

/// Keyed option storage.
pub trait SettingsStore: Send + Sync {
    /// Read an option, `None` if it was never set.
    fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or replace an option.
    fn set(&self, scope: Scope, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove an option. Returns whether it existed.
    fn delete(&self, scope: Scope, key: &str) -> Result<bool, StoreError>;
}

/// Typed access to a store bound to one persistence domain.
#[derive(Clone)]
pub struct Options {
    store: Arc<dyn SettingsStore>,
    scope: Scope,
}

impl Options {
    pub fn new(store: Arc<dyn SettingsStore>, scope: Scope) -> Self {
        Self { store, scope }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Read and decode an option, falling back to `T::default()` when unset.
    pub fn get_or_default<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        match self.store.get(self.scope, key)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(T::default()),
        }
    }

    /// Read and decode an option.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(self.scope, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encode and write an option.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.store.set(self.scope, key, value)
    }

    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.store.delete(self.scope, key)
    }
}
