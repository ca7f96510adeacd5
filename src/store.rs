//! Key/value settings persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use crate::error::{ChangerError, Result};

pub trait ConfigStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn persist(&mut self) -> Result<()>;
}

/// Settings kept as a flat TOML table of strings.
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl TomlConfigStore {
    /// Open the store at `path`. A missing file starts out empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(ChangerError::Store { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn persist(&mut self) -> Result<()> {
        let content = toml::to_string(&self.values)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ChangerError::Store {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, content).map_err(|source| ChangerError::Store {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store. Counts `persist` calls through a shared counter.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: BTreeMap<String, String>,
    persisted: Arc<AtomicUsize>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Handle to the persist counter, usable after the store is moved.
    pub fn persist_counter(&self) -> Arc<AtomicUsize> {
        self.persisted.clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn persist(&mut self) -> Result<()> {
        self.persisted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_opens_empty() {
        let temp = TempDir::new().unwrap();

        let store = TomlConfigStore::open(temp.path().join("settings.toml")).unwrap();

        assert!(store.get("PhotosPaths").is_none());
    }

    #[test]
    fn test_persisted_values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/settings.toml");
        let mut store = TomlConfigStore::open(&path).unwrap();
        store.set("PhotosPaths", "/a;/b".to_string());
        store.set("Interval", "15000".to_string());
        store.persist().unwrap();

        let reopened = TomlConfigStore::open(&path).unwrap();

        assert_eq!(reopened.path(), path.as_path());
        assert_eq!(reopened.get("PhotosPaths").as_deref(), Some("/a;/b"));
        assert_eq!(reopened.get("Interval").as_deref(), Some("15000"));
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.toml");
        fs::write(&path, "this is = = not toml").unwrap();

        let err = TomlConfigStore::open(&path).unwrap_err();

        assert!(matches!(err, ChangerError::StoreFormat(_)));
    }

    #[test]
    fn test_memory_store_counts_persists() {
        let mut store = MemoryConfigStore::new();
        let counter = store.persist_counter();

        store.persist().unwrap();
        store.persist().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
