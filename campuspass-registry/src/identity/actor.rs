//! IdentityActor — Tokio actor for identity operations
//!
//! All operations, reads included, are processed sequentially via an mpsc
//! channel, so no caller ever observes a half-applied write.
//!
//! # Usage
//!
//! ```rust,no_run
//! use campuspass_registry::identity::{student_hash, IdentityActor};
//! use campuspass_registry::{AccountKey, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::new("/data/campuspass");
//!     let handle = IdentityActor::spawn(&config).await?;
//!
//!     let alice: AccountKey = "ab".repeat(32).parse()?;
//!     handle.opt_in(alice).await?;
//!     handle.register(alice, student_hash("S12345").into_bytes()).await?;
//!
//!     let stored = handle.get_registered_hash(alice).await?;
//!     assert!(!stored.is_empty());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::account::AccountKey;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::store::{FileStore, KvStore};

use super::types::*;

// ─── Actor Messages ───

enum IdentityMsg {
    OptIn {
        caller: AccountKey,
        reply: oneshot::Sender<Result<IdentityRecord>>,
    },
    Register {
        caller: AccountKey,
        hash: Vec<u8>,
        reply: oneshot::Sender<Result<IdentityRecord>>,
    },
    GetRegisteredHash {
        account: AccountKey,
        reply: oneshot::Sender<Vec<u8>>,
    },
    GetRecord {
        account: AccountKey,
        reply: oneshot::Sender<Option<IdentityRecord>>,
    },
}

// ─── Actor ───

/// Identity actor — sole owner of the identity registry
pub struct IdentityActor {
    registry: IdentityRegistry,
    store: Arc<dyn KvStore>,
    rx: mpsc::Receiver<IdentityMsg>,
}

impl IdentityActor {
    /// Spawn with a file store under `config.state_dir`
    pub async fn spawn(config: &RegistryConfig) -> Result<IdentityHandle> {
        let store: Arc<dyn KvStore> = Arc::new(FileStore::new(&config.state_dir));
        Self::spawn_with_store(store, config.channel_capacity).await
    }

    /// Spawn with an existing store (for sharing with the permission actor)
    pub async fn spawn_with_store(
        store: Arc<dyn KvStore>,
        channel_capacity: usize,
    ) -> Result<IdentityHandle> {
        let registry = Self::restore(store.as_ref()).await?;
        let restored = registry.len();

        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let actor = Self { registry, store, rx };

        tokio::spawn(actor.run());
        info!(records = restored, "IdentityActor spawned");
        Ok(IdentityHandle { tx })
    }

    async fn restore(store: &dyn KvStore) -> Result<IdentityRegistry> {
        let entries = store.load(NAMESPACE).await?;
        let mut records = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let record: IdentityRecord = serde_json::from_value(value)?;
            let expected = AccountKey::from_storage_key(KEY_PREFIX, &key)?;
            if record.owner != expected {
                return Err(RegistryError::Store(format!(
                    "identity record {key} is owned by {}",
                    record.owner
                )));
            }
            records.push(record);
        }
        IdentityRegistry::from_records(records)
    }

    /// Main event loop
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                IdentityMsg::OptIn { caller, reply } => {
                    let _ = reply.send(self.handle_put(caller, Vec::new()).await);
                }
                IdentityMsg::Register { caller, hash, reply } => {
                    let _ = reply.send(self.handle_put(caller, hash).await);
                }
                IdentityMsg::GetRegisteredHash { account, reply } => {
                    let _ = reply.send(self.registry.get_registered_hash(&account));
                }
                IdentityMsg::GetRecord { account, reply } => {
                    let _ = reply.send(self.registry.get_record(&account).cloned());
                }
            }
        }
        info!("IdentityActor stopped");
    }

    // ─── Handler Implementations ───

    /// Persist first, then apply; a failed write leaves the registry unchanged
    async fn handle_put(&mut self, caller: AccountKey, hash: Vec<u8>) -> Result<IdentityRecord> {
        let record = IdentityRecord {
            owner: caller,
            hash,
        };
        self.store
            .put(
                NAMESPACE,
                &caller.storage_key(KEY_PREFIX),
                serde_json::to_value(&record)?,
            )
            .await?;

        let applied = if record.hash.is_empty() {
            self.registry.opt_in(&caller)?.clone()
        } else {
            self.registry.register(&caller, record.hash)?.clone()
        };

        if applied.is_registered() {
            info!(account = %caller, "Identity registered");
        } else {
            debug!(account = %caller, "Identity opted in");
        }
        Ok(applied)
    }
}

// ─── Handle (client-facing API) ───

/// Thread-safe handle to communicate with the IdentityActor
#[derive(Clone)]
pub struct IdentityHandle {
    tx: mpsc::Sender<IdentityMsg>,
}

impl IdentityHandle {
    /// Create or reset the caller's record with an empty hash
    pub async fn opt_in(&self, caller: AccountKey) -> Result<IdentityRecord> {
        let (reply, rx) = oneshot::channel();
        self.send(IdentityMsg::OptIn { caller, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("IdentityActor dropped".into()))?
    }

    /// Set the caller's own hash
    pub async fn register(&self, caller: AccountKey, hash: Vec<u8>) -> Result<IdentityRecord> {
        let (reply, rx) = oneshot::channel();
        self.send(IdentityMsg::Register { caller, hash, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("IdentityActor dropped".into()))?
    }

    /// Stored hash for `account`, empty when there is no record
    pub async fn get_registered_hash(&self, account: AccountKey) -> Result<Vec<u8>> {
        let (reply, rx) = oneshot::channel();
        self.send(IdentityMsg::GetRegisteredHash { account, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("IdentityActor dropped".into()))
    }

    pub async fn get_record(&self, account: AccountKey) -> Result<Option<IdentityRecord>> {
        let (reply, rx) = oneshot::channel();
        self.send(IdentityMsg::GetRecord { account, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("IdentityActor dropped".into()))
    }

    async fn send(&self, msg: IdentityMsg) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| RegistryError::ActorUnavailable("IdentityActor".into()))
    }
}
