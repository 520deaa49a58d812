//! Durable key/value storage for the session snapshot.
//!
//! The session store only ever writes two keys (`access_token` and `user`),
//! so the backends are plain string maps:
//!
//! - `FileStorage`: a JSON object in the application data directory
//! - `KeyringStorage`: one OS keychain entry per key
//! - `MemoryStorage`: process-local, for tests and ephemeral runs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

/// Storage file name in the data directory
const STORAGE_FILE: &str = "storage.json";

/// Sibling file written first and renamed over the storage file
const STORAGE_TMP_FILE: &str = "storage.json.tmp";

/// Keychain service name the keyring backend files its entries under
const KEYRING_SERVICE: &str = "labdesk";

/// Synchronous string key/value storage that survives restarts.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// File backend
// ============================================================================

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read storage file {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse storage file")
    }

    /// Entries to start a mutation from. An unreadable file is discarded so
    /// that clearing and re-login always succeed.
    fn read_for_update(&self) -> BTreeMap<String, String> {
        match self.read_all() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable storage file");
                BTreeMap::new()
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove storage file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_file_name(STORAGE_TMP_FILE);
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write storage file {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace storage file {}", self.path.display()))?;
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_for_update();
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.read_for_update();
        if entries.remove(key).is_some() {
            debug!(key, "Removed storage entry");
        }
        self.write_all(&entries)
    }
}

// ============================================================================
// Keyring backend
// ============================================================================

pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStorage for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete keychain entry"),
        }
    }
}

// ============================================================================
// Memory backend
// ============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory storage lock poisoned"))
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map(|e| e.is_empty()).unwrap_or(true)
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Shared handles let a test keep reading the storage a store owns.
impl<T: DurableStorage + ?Sized> DurableStorage for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("labdesk-storage-{}-{}", std::process::id(), n))
    }

    #[test]
    fn test_memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("access_token").unwrap(), None);

        storage.set("access_token", "abc").unwrap();
        assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("abc"));

        storage.remove("access_token").unwrap();
        storage.remove("access_token").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = temp_dir();
        {
            let storage = FileStorage::new(&dir);
            storage.set("access_token", "abc").unwrap();
            storage.set("user", r#"{"id":1}"#).unwrap();
        }

        let reopened = FileStorage::new(&dir);
        assert_eq!(reopened.get("access_token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("user").unwrap().as_deref(), Some(r#"{"id":1}"#));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_storage_removes_file_when_empty() {
        let dir = temp_dir();
        let storage = FileStorage::new(&dir);
        storage.set("access_token", "abc").unwrap();
        assert!(storage.path().exists());

        storage.remove("access_token").unwrap();
        assert!(!storage.path().exists());
        assert_eq!(storage.get("access_token").unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_storage_corrupt_file_is_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let storage = FileStorage::new(&dir);
        std::fs::write(storage.path(), "not json").unwrap();

        assert!(storage.get("access_token").is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_storage_remove_deletes_corrupt_file() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let storage = FileStorage::new(&dir);
        std::fs::write(storage.path(), r#"{"access_token": "tok", "us"#).unwrap();

        storage.remove("access_token").unwrap();
        assert!(!storage.path().exists());
        assert_eq!(storage.get("user").unwrap(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_storage_set_replaces_corrupt_file() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let storage = FileStorage::new(&dir);
        std::fs::write(storage.path(), "not json").unwrap();

        storage.set("access_token", "abc").unwrap();
        assert_eq!(storage.get("access_token").unwrap().as_deref(), Some("abc"));
        assert!(!dir.join(STORAGE_TMP_FILE).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
