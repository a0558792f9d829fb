//! Key-value persistence with a per-session and a durable namespace

use ahash::AHashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::error::Result;

/// Lifetime of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Cleared when the process exits
    Session,
    /// Survives restarts
    Durable,
}

/// String key-value storage the host persists through
pub trait KeyValueStore {
    fn get(&self, namespace: Namespace, key: &str) -> Option<String>;

    fn set(&mut self, namespace: Namespace, key: &str, value: String) -> Result<()>;

    fn remove(&mut self, namespace: Namespace, key: &str) -> Result<()>;
}

/// Volatile store for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: AHashMap<(Namespace, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: Namespace, key: &str) -> Option<String> {
        self.entries.get(&(namespace, key.to_string())).cloned()
    }

    fn set(&mut self, namespace: Namespace, key: &str, value: String) -> Result<()> {
        self.entries.insert((namespace, key.to_string()), value);
        Ok(())
    }

    fn remove(&mut self, namespace: Namespace, key: &str) -> Result<()> {
        self.entries.remove(&(namespace, key.to_string()));
        Ok(())
    }
}

/// File name of the durable store inside its directory
pub const STORE_FILE: &str = "store.json";

/// Durable values kept in one JSON object file; session values in memory
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    session: AHashMap<String, String>,
    durable: BTreeMap<String, String>,
}

impl FileStore {
    /// Open or create the store in `dir`
    ///
    /// An unreadable store file is logged and replaced on the next write.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(STORE_FILE);

        let durable = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Store file is corrupt, starting empty");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = durable.len(), "Opened store");
        Ok(Self {
            path,
            session: AHashMap::new(),
            durable,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.durable)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, namespace: Namespace, key: &str) -> Option<String> {
        match namespace {
            Namespace::Session => self.session.get(key).cloned(),
            Namespace::Durable => self.durable.get(key).cloned(),
        }
    }

    fn set(&mut self, namespace: Namespace, key: &str, value: String) -> Result<()> {
        match namespace {
            Namespace::Session => {
                self.session.insert(key.to_string(), value);
                Ok(())
            }
            Namespace::Durable => {
                self.durable.insert(key.to_string(), value);
                self.flush()
            }
        }
    }

    fn remove(&mut self, namespace: Namespace, key: &str) -> Result<()> {
        match namespace {
            Namespace::Session => {
                self.session.remove(key);
                Ok(())
            }
            Namespace::Durable => {
                if self.durable.remove(key).is_some() {
                    self.flush()?;
                }
                Ok(())
            }
        }
    }
}
