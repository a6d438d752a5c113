//! Key/value persistence for registry state
//!
//! Each registry owns one namespace and writes single records through
//! [`KvStore`]. Actors persist a change before applying it in memory, so a
//! failed write leaves the registry untouched.
//!
//! # Example
//!
//! ```rust,no_run
//! use campuspass_registry::store::{FileStore, KvStore};
//!
//! #[tokio::main]
//! async fn main() -> campuspass_registry::Result<()> {
//!     let store = FileStore::new("/data/campuspass/state");
//!     store.put("permission", "perm_00ff", serde_json::json!({ "expiry": 1000 })).await?;
//!     let records = store.load("permission").await?;
//!     assert_eq!(records.len(), 1);
//!     Ok(())
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{RegistryError, Result};

/// All records of one namespace, keyed by storage key
pub type Namespace = BTreeMap<String, Value>;

/// Persistence collaborator for registry actors
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Load every record in `namespace` (empty if it was never written)
    async fn load(&self, namespace: &str) -> Result<Namespace>;

    /// Insert or overwrite one record
    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()>;

    /// Remove one record. Removing an absent key is a no-op.
    async fn delete(&self, namespace: &str, key: &str) -> Result<()>;
}

// ─── In-memory ───

/// Process-local store, used for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: Mutex<HashMap<String, Namespace>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn load(&self, namespace: &str) -> Result<Namespace> {
        let guard = self.namespaces.lock().await;
        Ok(guard.get(namespace).cloned().unwrap_or_default())
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        let mut guard = self.namespaces.lock().await;
        guard
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut guard = self.namespaces.lock().await;
        if let Some(records) = guard.get_mut(namespace) {
            records.remove(key);
        }
        Ok(())
    }
}

// ─── File-backed ───

/// One pretty-printed JSON object per namespace under a base directory
///
/// ```text
/// {base}/
/// ├── identity.json
/// └── permission.json
/// ```
#[derive(Debug)]
pub struct FileStore {
    base: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the file backing `namespace`
    pub fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.base.join(format!("{namespace}.json"))
    }

    async fn read_namespace(&self, namespace: &str) -> Result<Namespace> {
        let path = self.namespace_path(namespace);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Ok(Namespace::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                RegistryError::Store(format!("corrupt namespace file {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Namespace::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_namespace(&self, namespace: &str, records: &Namespace) -> Result<()> {
        tokio::fs::create_dir_all(&self.base).await?;
        let path = self.namespace_path(namespace);
        let tmp = self.base.join(format!(".{namespace}.json.tmp"));

        let mut body = serde_json::to_string_pretty(records)?;
        body.push('\n');
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(namespace, records = records.len(), "Namespace written");
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn load(&self, namespace: &str) -> Result<Namespace> {
        self.read_namespace(namespace).await
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_namespace(namespace).await?;
        records.insert(key.to_string(), value);
        self.write_namespace(namespace, &records).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_namespace(namespace).await?;
        if records.remove(key).is_none() {
            return Ok(());
        }
        self.write_namespace(namespace, &records).await
    }
}
