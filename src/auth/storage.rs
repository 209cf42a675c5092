// Key-value storage backends
// Durable and session-scoped storage behind one small trait

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

use super::events::AuthBus;
use crate::error::{AuthError, Result};

/// String key-value storage in the shape of the browser's Web Storage
pub trait KeyValueStorage: Send + Sync {
    /// Capability check; unavailable backends fail every call
    fn is_available(&self) -> bool {
        true
    }

    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;

    /// Write several keys; backends that can commit them at once should
    fn set_items(&self, items: &[(&str, &str)]) -> Result<()> {
        for (key, value) in items {
            self.set_item(key, value)?;
        }
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }
}

/// In-process storage; used for session scope and as a test fake
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage for contexts with no backing store at all
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn is_available(&self) -> bool {
        false
    }

    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Err(AuthError::StorageUnavailable(
            "no storage in this execution context".to_string(),
        ))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Err(AuthError::StorageUnavailable(
            "no storage in this execution context".to_string(),
        ))
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
        Err(AuthError::StorageUnavailable(
            "no storage in this execution context".to_string(),
        ))
    }
}

/// Durable storage kept as one JSON object on disk
///
/// Every read goes to the file so several processes sharing the path see
/// each other's writes. Writes replace the file through a rename.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(AuthError::StorageUnavailable(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            AuthError::StorageUnavailable(format!(
                "failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let unavailable = |e: std::io::Error| {
            AuthError::StorageUnavailable(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            ))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(unavailable)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| AuthError::Internal(anyhow::Error::new(e)))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(unavailable)?;
        std::fs::rename(&tmp, &self.path).map_err(unavailable)?;
        Ok(())
    }

    fn modified_at(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.set_items(&[(key, value)])
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.remove_items(&[key])
    }

    fn set_items(&self, items: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.load()?;
        for (key, value) in items {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        self.persist(&entries)
    }

    fn remove_items(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.load()?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before && !self.path.exists() {
            return Ok(());
        }
        self.persist(&entries)
    }
}

/// Poll a file backend and publish a storage change whenever it is rewritten
///
/// Stands in for the browser's cross-tab `storage` event: another process
/// writing the same file shows up here.
pub fn spawn_change_watcher(storage: FileStorage, bus: AuthBus, interval: Duration) -> JoinHandle<()> {
    // Baseline taken now so writes before the first poll are still seen
    let mut last_seen = storage.modified_at();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let current = storage.modified_at();
            if current != last_seen {
                tracing::debug!(path = %storage.path().display(), "Storage file changed");
                last_seen = current;
                bus.notify_storage_changed(None);
            }
        }
    })
}
