//! Key-value storage for persisted settings
//!
//! Mirrors the extension's local storage area: string keys mapped to JSON
//! values. `MemoryStore` backs tests and throwaway sessions, `SledStore`
//! persists to an embedded database on disk.

use crate::error::{Result, SidekickError};
use directories::ProjectDirs;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key-value store holding JSON values
pub trait SettingsStore: Send + Sync {
    /// Read one key
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write one key
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete one key; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Read several keys, omitting the ones that are absent
    fn get_many(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let mut found = Map::new();
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.insert((*key).to_string(), value);
            }
        }
        Ok(found)
    }

    /// Write several keys
    fn set_many(&self, values: Map<String, Value>) -> Result<()> {
        for (key, value) in values {
            self.set(&key, value)?;
        }
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| SidekickError::Storage("Failed to acquire read lock".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SidekickError::Storage("Failed to acquire write lock".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SidekickError::Storage("Failed to acquire write lock".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Store backed by an embedded `sled` database
pub struct SledStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledStore {
    /// Open or create a store at `path`
    ///
    /// # Errors
    ///
    /// Returns `SidekickError::Storage` if the database cannot be opened
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SidekickError::Storage(format!("Failed to create store directory: {}", e))
            })?;
        }
        let db = sled::open(&path)
            .map_err(|e| SidekickError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!("Opened settings store at {}", path.display());
        Ok(Self { db, path })
    }

    /// Open the store at the platform data directory
    pub fn open_default() -> Result<Self> {
        Self::new(default_store_path()?)
    }

    /// Location of the database on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| SidekickError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    SidekickError::Storage(format!("Deserialization failed: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let bytes = serde_json::to_vec(&value)
            .map_err(|e| SidekickError::Storage(format!("Serialization failed: {}", e)))?;
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| SidekickError::Storage(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| SidekickError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| SidekickError::Storage(format!("Remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| SidekickError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

/// Default on-disk location of the settings database
///
/// `SIDEKICK_STORE_PATH` overrides the platform data directory.
pub fn default_store_path() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("SIDEKICK_STORE_PATH") {
        return Ok(PathBuf::from(override_path));
    }
    let proj_dirs = ProjectDirs::from("org", "sidekick", "sidekick")
        .ok_or_else(|| SidekickError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().join("settings.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip_and_remove() {
        let store = MemoryStore::new();
        assert!(store.get("model").unwrap().is_none());
        store.set("model", json!("mistral")).unwrap();
        assert_eq!(store.get("model").unwrap(), Some(json!("mistral")));
        store.remove("model").unwrap();
        assert!(store.get("model").unwrap().is_none());
        store.remove("model").unwrap();
    }

    #[test]
    fn test_get_many_skips_missing_keys() {
        let store = MemoryStore::new();
        store.set("endpoint", json!("http://localhost:11434")).unwrap();
        let found = store.get_many(&["endpoint", "model"]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("endpoint"));
    }

    #[test]
    fn test_sled_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.db");
        {
            let store = SledStore::new(&path).unwrap();
            store.set("maxTokens", json!(4000)).unwrap();
            store.set("autoSummarize", json!(true)).unwrap();
        }
        let store = SledStore::new(&path).unwrap();
        assert_eq!(store.get("maxTokens").unwrap(), Some(json!(4000)));
        assert_eq!(store.get("autoSummarize").unwrap(), Some(json!(true)));
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_sled_store_set_many_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = SledStore::new(dir.path().join("nested").join("settings.db")).unwrap();
        let mut values = Map::new();
        values.insert("endpoint".to_string(), json!("http://gpu-box:11434"));
        values.insert("model".to_string(), json!("llama3"));
        store.set_many(values).unwrap();
        assert_eq!(store.get_many(&["endpoint", "model"]).unwrap().len(), 2);
        store.remove("model").unwrap();
        assert!(store.get("model").unwrap().is_none());
    }
}
