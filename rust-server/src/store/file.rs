//! JSON-file settings store.
//!
//! Each persistence domain is one JSON object on disk (`site.json`,
//! `network.json`). Writes go to a temp file in the same directory and are
//! renamed over the original, so a crash never leaves a half-written file.
//!
//! The store API is synchronous. Called from a multi-threaded tokio runtime,
//! the file IO runs under `block_in_place` so the worker's other tasks move
//! to another thread while the disk is busy.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info};

use super::{Scope, SettingsStore, StoreError};

/// Settings persisted as one JSON document per scope.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "settings_store_opened");
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn path_for(&self, scope: Scope) -> PathBuf {
        self.dir.join(format!("{}.json", scope.as_str()))
    }

    fn read_all(&self, path: &Path) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.is_empty() {
            return Ok(Map::new());
        }

        Ok(serde_json::from_slice(&raw)?)
    }

    fn write_all(&self, path: &Path, values: &Map<String, Value>) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(values)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.persist(path).map_err(|e| e.error)?;

        debug!(path = %path.display(), bytes = data.len(), "settings_file_written");
        Ok(())
    }
}

/// Run blocking file IO, handing the current worker's tasks off first when
/// inside a multi-threaded runtime.
fn off_worker<T>(io: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(io)
        }
        _ => io(),
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, scope: Scope, key: &str) -> Result<Option<Value>, StoreError> {
        off_worker(|| {
            let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
            let mut values = self.read_all(&self.path_for(scope))?;
            Ok(values.remove(key))
        })
    }

    fn set(&self, scope: Scope, key: &str, value: Value) -> Result<(), StoreError> {
        off_worker(|| {
            let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
            let path = self.path_for(scope);
            let mut values = self.read_all(&path)?;
            values.insert(key.to_string(), value);
            self.write_all(&path, &values)
        })
    }

    fn delete(&self, scope: Scope, key: &str) -> Result<bool, StoreError> {
        off_worker(|| {
            let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
            let path = self.path_for(scope);
            let mut values = self.read_all(&path)?;
            if values.remove(key).is_none() {
                return Ok(false);
            }
            self.write_all(&path, &values)?;
            Ok(true)
        })
    }
}
