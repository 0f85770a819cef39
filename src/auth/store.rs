//! Two-scope key/value persistence for credentials.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;

/// Lifetime of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Survives restarts.
    Durable,
    /// Lives as long as the current session.
    Session,
}

impl StorageScope {
    /// Lookup order used by the token resolver.
    pub const ORDERED: [StorageScope; 2] = [StorageScope::Durable, StorageScope::Session];
}

/// Synchronous key/value store with a durable and a session scope.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, scope: StorageScope, key: &str) -> Option<String>;
    fn set(&self, scope: StorageScope, key: &str, value: &str);
    fn remove(&self, scope: StorageScope, key: &str);
}

/// Both scopes in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<(StorageScope, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, scope: StorageScope, key: &str) -> Option<String> {
        self.inner
            .get(&(scope, key.to_string()))
            .map(|r| r.value().clone())
    }

    fn set(&self, scope: StorageScope, key: &str, value: &str) {
        self.inner.insert((scope, key.to_string()), value.to_string());
    }

    fn remove(&self, scope: StorageScope, key: &str) {
        self.inner.remove(&(scope, key.to_string()));
    }
}

/// Durable scope persisted as a JSON object file; session scope in memory.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    durable: Mutex<HashMap<String, String>>,
    session: DashMap<String, String>,
}

impl FileStore {
    /// Open the store, loading the durable scope if the file exists.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut durable = HashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            durable = serde_json::from_reader(reader)?;
            tracing::debug!(path = ?path, entries = durable.len(), "Loaded credential store");
        }

        Ok(Self {
            path,
            durable: Mutex::new(durable),
            session: DashMap::new(),
        })
    }

    fn persist(&self, map: &HashMap<String, String>) {
        let result = File::create(&self.path).and_then(|file| {
            serde_json::to_writer(BufWriter::new(file), map).map_err(std::io::Error::from)
        });
        if let Err(e) = result {
            tracing::warn!(path = ?self.path, error = %e, "Failed to persist credential store");
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, scope: StorageScope, key: &str) -> Option<String> {
        match scope {
            StorageScope::Durable => self
                .durable
                .lock()
                .expect("credential store mutex poisoned")
                .get(key)
                .cloned(),
            StorageScope::Session => self.session.get(key).map(|r| r.value().clone()),
        }
    }

    fn set(&self, scope: StorageScope, key: &str, value: &str) {
        match scope {
            StorageScope::Durable => {
                let mut durable = self.durable.lock().expect("credential store mutex poisoned");
                durable.insert(key.to_string(), value.to_string());
                self.persist(&durable);
            }
            StorageScope::Session => {
                self.session.insert(key.to_string(), value.to_string());
            }
        }
    }

    fn remove(&self, scope: StorageScope, key: &str) {
        match scope {
            StorageScope::Durable => {
                let mut durable = self.durable.lock().expect("credential store mutex poisoned");
                if durable.remove(key).is_some() {
                    self.persist(&durable);
                }
            }
            StorageScope::Session => {
                self.session.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_scopes_are_separate() {
        let store = MemoryStore::new();
        store.set(StorageScope::Durable, "token", "d");
        store.set(StorageScope::Session, "token", "s");

        assert_eq!(store.get(StorageScope::Durable, "token").as_deref(), Some("d"));
        assert_eq!(store.get(StorageScope::Session, "token").as_deref(), Some("s"));

        store.remove(StorageScope::Durable, "token");
        assert!(store.get(StorageScope::Durable, "token").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_file_store_persists_durable_scope_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.set(StorageScope::Durable, "crm_token", "abc");
        store.set(StorageScope::Session, "crm_token", "xyz");
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(StorageScope::Durable, "crm_token").as_deref(), Some("abc"));
        assert!(reopened.get(StorageScope::Session, "crm_token").is_none());

        reopened.remove(StorageScope::Durable, "crm_token");
        let again = FileStore::open(&path).unwrap();
        assert!(again.get(StorageScope::Durable, "crm_token").is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(FileStore::open(&path).is_err());
    }
}
