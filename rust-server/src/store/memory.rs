//! In-process settings store.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{Scope, SettingsStore, StoreError};

/// Settings kept in a mutex-guarded map. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<(Scope, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(&(scope, key.to_string())).cloned())
    }

    fn set(&self, scope: Scope, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert((scope, key.to_string()), value);
        Ok(())
    }

    fn delete(&self, scope: Scope, key: &str) -> Result<bool, StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.remove(&(scope, key.to_string())).is_some())
    }
}
