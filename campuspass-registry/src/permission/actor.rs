//! PermissionActor — Tokio actor for time-bounded permissions
//!
//! Grants and revocations are restricted to the authority fixed at spawn
//! time. `has_permission` reads the injected clock exactly once per call.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use campuspass_registry::clock::SystemClock;
//! use campuspass_registry::permission::PermissionActor;
//! use campuspass_registry::{AccountKey, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::new("/data/campuspass");
//!     let admin: AccountKey = "ad".repeat(32).parse()?;
//!     let student: AccountKey = "01".repeat(32).parse()?;
//!
//!     let handle = PermissionActor::spawn(&config, admin, Arc::new(SystemClock)).await?;
//!     handle.grant(admin, student, 1_900_000_000).await?;
//!     assert!(handle.has_permission(student).await?);
//!
//!     handle.revoke(admin, student).await?;
//!     assert!(!handle.has_permission(student).await?);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::account::AccountKey;
use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::store::{FileStore, KvStore};

use super::types::*;

// ─── Actor Messages ───

enum PermissionMsg {
    Grant {
        caller: AccountKey,
        account: AccountKey,
        expiry: u64,
        reply: oneshot::Sender<Result<PermissionRecord>>,
    },
    Revoke {
        caller: AccountKey,
        account: AccountKey,
        reply: oneshot::Sender<Result<Option<PermissionRecord>>>,
    },
    HasPermission {
        account: AccountKey,
        reply: oneshot::Sender<bool>,
    },
    GetRecord {
        account: AccountKey,
        reply: oneshot::Sender<Option<PermissionRecord>>,
    },
}

// ─── Actor ───

/// Permission actor — sole owner of the permission registry
pub struct PermissionActor {
    registry: PermissionRegistry,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    rx: mpsc::Receiver<PermissionMsg>,
}

impl PermissionActor {
    /// Spawn with a file store under `config.state_dir`
    pub async fn spawn(
        config: &RegistryConfig,
        authority: AccountKey,
        clock: Arc<dyn Clock>,
    ) -> Result<PermissionHandle> {
        let store: Arc<dyn KvStore> = Arc::new(FileStore::new(&config.state_dir));
        Self::spawn_with_store(store, authority, clock, config.channel_capacity).await
    }

    /// Spawn with an existing store (for sharing with the identity actor)
    ///
    /// The authority is recorded on first spawn; respawning the same
    /// namespace with a different authority fails.
    pub async fn spawn_with_store(
        store: Arc<dyn KvStore>,
        authority: AccountKey,
        clock: Arc<dyn Clock>,
        channel_capacity: usize,
    ) -> Result<PermissionHandle> {
        let registry = Self::restore(store.as_ref(), authority).await?;
        let restored = registry.len();

        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let actor = Self {
            registry,
            store,
            clock,
            rx,
        };

        tokio::spawn(actor.run());
        info!(authority = %authority, records = restored, "PermissionActor spawned");
        Ok(PermissionHandle { tx, authority })
    }

    async fn restore(store: &dyn KvStore, authority: AccountKey) -> Result<PermissionRegistry> {
        let entries = store.load(NAMESPACE).await?;

        let stored = entries
            .get(AUTHORITY_KEY)
            .map(|v| serde_json::from_value::<AccountKey>(v.clone()))
            .transpose()?;
        if let Some(stored) = stored {
            if stored != authority {
                return Err(RegistryError::Config(format!(
                    "permission registry was created by {stored}, not {authority}"
                )));
            }
        }

        let mut records = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if key == AUTHORITY_KEY {
                continue;
            }
            let record: PermissionRecord = serde_json::from_value(value)?;
            let expected = AccountKey::from_storage_key(KEY_PREFIX, &key)?;
            if record.account != expected {
                return Err(RegistryError::Store(format!(
                    "permission record {key} belongs to {}",
                    record.account
                )));
            }
            records.push(record);
        }

        // Pin the authority only once every record has loaded
        if stored.is_none() {
            if !records.is_empty() {
                return Err(RegistryError::Config(format!(
                    "permission namespace holds {} grants but no {AUTHORITY_KEY}",
                    records.len()
                )));
            }
            store
                .put(NAMESPACE, AUTHORITY_KEY, Value::String(authority.to_hex()))
                .await?;
        }

        Ok(PermissionRegistry::from_records(authority, records))
    }

    /// Main event loop
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                PermissionMsg::Grant { caller, account, expiry, reply } => {
                    let _ = reply.send(self.handle_grant(caller, account, expiry).await);
                }
                PermissionMsg::Revoke { caller, account, reply } => {
                    let _ = reply.send(self.handle_revoke(caller, account).await);
                }
                PermissionMsg::HasPermission { account, reply } => {
                    let _ = reply.send(self.handle_has_permission(&account));
                }
                PermissionMsg::GetRecord { account, reply } => {
                    let _ = reply.send(self.registry.get_record(&account).copied());
                }
            }
        }
        info!("PermissionActor stopped");
    }

    // ─── Handler Implementations ───

    fn authorize(&self, caller: &AccountKey, op: &'static str) -> Result<()> {
        self.registry.authorize(caller).inspect_err(|_| {
            warn!(caller = %caller, op, "Rejected non-authority caller");
        })
    }

    async fn handle_grant(
        &mut self,
        caller: AccountKey,
        account: AccountKey,
        expiry: u64,
    ) -> Result<PermissionRecord> {
        self.authorize(&caller, "grant")?;

        let record = PermissionRecord { account, expiry };
        self.store
            .put(
                NAMESPACE,
                &account.storage_key(KEY_PREFIX),
                serde_json::to_value(record)?,
            )
            .await?;
        let record = self.registry.grant(&caller, account, expiry)?;

        let now = self.clock.now_secs();
        if !record.is_valid_at(now) {
            debug!(account = %account, expiry, now, "Granted expiry is already in the past");
        }
        info!(account = %account, expiry, "Permission granted");
        Ok(record)
    }

    async fn handle_revoke(
        &mut self,
        caller: AccountKey,
        account: AccountKey,
    ) -> Result<Option<PermissionRecord>> {
        self.authorize(&caller, "revoke")?;

        if self.registry.get_record(&account).is_none() {
            debug!(account = %account, "Revoke on account without grant");
            return Ok(None);
        }

        self.store
            .delete(NAMESPACE, &account.storage_key(KEY_PREFIX))
            .await?;
        let removed = self.registry.revoke(&caller, &account)?;
        info!(account = %account, "Permission revoked");
        Ok(removed)
    }

    fn handle_has_permission(&self, account: &AccountKey) -> bool {
        let now = self.clock.now_secs();
        let allowed = self.registry.has_permission(account, now);
        debug!(account = %account, now, allowed, "Permission checked");
        allowed
    }
}

// ─── Handle (client-facing API) ───

/// Thread-safe handle to communicate with the PermissionActor
#[derive(Clone)]
pub struct PermissionHandle {
    tx: mpsc::Sender<PermissionMsg>,
    authority: AccountKey,
}

impl PermissionHandle {
    /// The authority this registry was created with
    pub fn authority(&self) -> AccountKey {
        self.authority
    }

    pub async fn grant(
        &self,
        caller: AccountKey,
        account: AccountKey,
        expiry: u64,
    ) -> Result<PermissionRecord> {
        let (reply, rx) = oneshot::channel();
        self.send(PermissionMsg::Grant { caller, account, expiry, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("PermissionActor dropped".into()))?
    }

    /// Remove `account`'s grant. Succeeds with `None` when there was none.
    pub async fn revoke(
        &self,
        caller: AccountKey,
        account: AccountKey,
    ) -> Result<Option<PermissionRecord>> {
        let (reply, rx) = oneshot::channel();
        self.send(PermissionMsg::Revoke { caller, account, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("PermissionActor dropped".into()))?
    }

    pub async fn has_permission(&self, account: AccountKey) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(PermissionMsg::HasPermission { account, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("PermissionActor dropped".into()))
    }

    pub async fn get_record(&self, account: AccountKey) -> Result<Option<PermissionRecord>> {
        let (reply, rx) = oneshot::channel();
        self.send(PermissionMsg::GetRecord { account, reply }).await?;
        rx.await
            .map_err(|_| RegistryError::ActorUnavailable("PermissionActor dropped".into()))
    }

    async fn send(&self, msg: PermissionMsg) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| RegistryError::ActorUnavailable("PermissionActor".into()))
    }
}
