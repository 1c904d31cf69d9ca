//! Key/value persistence collaborator.
//!
//! Every persisted record in the system (memory, knowledge graph, fallback
//! stats, sleep state, duration stats, reflection data) is a JSON document
//! stored under a fixed key. Two stores ship here: an in-memory map for
//! tests and an on-disk store with one JSON file per key.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StorageError;

/// A string-keyed store of JSON documents.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw document stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the document stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Load and decode the document under `key`.
///
/// Returns `Ok(None)` when the key is absent and `Corrupted` when the stored
/// value does not decode.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::Corrupted {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Encode `value` and store it under `key`.
pub fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::WriteFailed {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.set(key, &raw)
}

/// Like [`load_json`], but logs and returns `None` on any failure.
///
/// Used on startup where a corrupted record must not prevent the pet from
/// coming up.
pub fn load_json_or_warn<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match load_json(store, key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Ignoring unreadable persisted record");
            None
        }
    }
}

/// Volatile store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|e| StorageError::ReadFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|e| StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|e| StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        entries.remove(key);
        Ok(())
    }
}

/// Durable store: one `<key>.json` file per key inside a directory.
///
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File store opened");
        Self { dir }
    }

    /// Default location: `~/.petmind/state`
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".petmind").join("state")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers, but never let one escape the directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let write_err = |e: std::io::Error| StorageError::WriteFailed {
            key: key.to_string(),
            reason: e.to_string(),
        };
        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        std::fs::write(self.path_for(key), value).map_err(write_err)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        count: u32,
        label: String,
    }

    #[test]
    fn in_memory_roundtrip_and_remove() {
        let store = InMemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn json_helpers_decode_and_report_corruption() {
        let store = InMemoryStore::new();
        let record = Record {
            count: 3,
            label: "x".into(),
        };
        save_json(&store, "rec", &record).unwrap();
        let loaded: Option<Record> = load_json(&store, "rec").unwrap();
        assert_eq!(loaded, Some(record));

        store.set("bad", "{not json").unwrap();
        let err = load_json::<Record>(&store, "bad").unwrap_err();
        assert!(matches!(err, StorageError::Corrupted { .. }));
        assert!(load_json_or_warn::<Record>(&store, "bad").is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));
        assert!(store.get("ai_memory").unwrap().is_none());
        store.set("ai_memory", "[]").unwrap();

        let reopened = FileStore::new(dir.path().join("state"));
        assert_eq!(reopened.get("ai_memory").unwrap().as_deref(), Some("[]"));
        reopened.remove("ai_memory").unwrap();
        reopened.remove("ai_memory").unwrap();
        assert!(reopened.get("ai_memory").unwrap().is_none());
    }

    #[test]
    fn file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set("../escape", "1").unwrap();
        assert!(dir.path().join(".._escape.json").exists());
    }
}
