//! JSON-file-backed key-value store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{KeyValueStore, StoreError};

/// Configuration for the file store.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path to the store file.
    pub path: PathBuf,
    /// Pretty-print the JSON (easier to inspect, larger on disk).
    pub pretty: bool,
}

impl FileStoreConfig {
    /// Create a new config for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: false,
        }
    }

    /// Pretty-print the JSON file.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        // Default to a store file in the current directory
        Self::new("pulse_store.json")
    }
}

/// Key-value store persisted as a single JSON object on disk.
///
/// The whole map is held in memory; every `set` rewrites the file through a
/// temporary file and a rename, so a crash mid-write leaves the previous
/// contents intact.
#[derive(Debug)]
pub struct FileStore {
    config: FileStoreConfig,
    inner: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store, loading existing contents if the file exists.
    ///
    /// Creates parent directories if they don't exist.
    pub fn open(config: FileStoreConfig) -> Result<Self, StoreError> {
        let map = match std::fs::read_to_string(&config.path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                    message: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self {
            config,
            inner: RwLock::new(map),
        })
    }

    /// Get the store file path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn write_file(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = if self.config.pretty {
            serde_json::to_string_pretty(map)
        } else {
            serde_json::to_string(map)
        }
        .map_err(|e| StoreError::Corrupt {
            message: e.to_string(),
        })?;

        let tmp = self.config.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.config.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let previous = guard.insert(key.to_string(), value);

        if let Err(e) = self.write_file(&guard) {
            // Keep memory consistent with what is on disk
            match previous {
                Some(old) => guard.insert(key.to_string(), old),
                None => guard.remove(key),
            };
            return Err(e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(FileStoreConfig::new(&path)).unwrap();
        store.set("history:1:A", "{}".to_string()).unwrap();
        store.set("favorites", "[]".to_string()).unwrap();
        drop(store);

        let reopened = FileStore::open(FileStoreConfig::new(&path)).unwrap();
        assert_eq!(reopened.get("history:1:A").unwrap().as_deref(), Some("{}"));
        assert_eq!(reopened.get("favorites").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(FileStoreConfig::new(dir.path().join("none.json"))).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStore::open(FileStoreConfig::new(&path)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("store.json");

        let store = FileStore::open(FileStoreConfig::new(&path).with_pretty(true)).unwrap();
        store.set("k", "v".to_string()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
