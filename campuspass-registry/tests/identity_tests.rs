//! IdentityActor integration tests — opt-in, register, reads, restore

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use campuspass_registry::identity::{student_hash, IdentityActor};
use campuspass_registry::store::{FileStore, KvStore, MemoryStore, Namespace};
use campuspass_registry::{AccountKey, RegistryConfig, RegistryError, Result};

fn key(b: u8) -> AccountKey {
    AccountKey::from_bytes([b; 32])
}

/// MemoryStore whose writes can be switched off mid-test
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn load(&self, namespace: &str) -> Result<Namespace> {
        self.inner.load(namespace).await
    }

    async fn put(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Store(format!("unavailable: {namespace}/{key}")));
        }
        self.inner.put(namespace, key, value).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        self.inner.delete(namespace, key).await
    }
}

#[tokio::test]
async fn test_register_scenario() {
    let handle = IdentityActor::spawn_with_store(Arc::new(MemoryStore::new()), 16)
        .await
        .unwrap();
    let alice = key(1);
    let bob = key(2);

    assert!(handle.get_registered_hash(alice).await.unwrap().is_empty());

    handle.register(alice, b"h1".to_vec()).await.unwrap();
    assert_eq!(handle.get_registered_hash(alice).await.unwrap(), b"h1");

    handle.register(alice, b"h2".to_vec()).await.unwrap();
    assert_eq!(handle.get_registered_hash(alice).await.unwrap(), b"h2");

    assert!(handle.get_registered_hash(bob).await.unwrap().is_empty());
    assert!(handle.get_record(bob).await.unwrap().is_none());
}

#[tokio::test]
async fn test_opt_in_creates_then_resets() {
    let handle = IdentityActor::spawn_with_store(Arc::new(MemoryStore::new()), 16)
        .await
        .unwrap();
    let alice = key(1);

    let record = handle.opt_in(alice).await.unwrap();
    assert_eq!(record.owner, alice);
    assert!(record.hash.is_empty());

    handle.register(alice, b"h1".to_vec()).await.unwrap();
    handle.opt_in(alice).await.unwrap();

    let record = handle.get_record(alice).await.unwrap().unwrap();
    assert!(!record.is_registered());
}

#[tokio::test]
async fn test_register_only_touches_caller() {
    let handle = IdentityActor::spawn_with_store(Arc::new(MemoryStore::new()), 16)
        .await
        .unwrap();
    let alice = key(1);
    let mallory = key(9);

    handle.register(alice, b"alice-hash".to_vec()).await.unwrap();
    handle.register(mallory, b"forged".to_vec()).await.unwrap();

    assert_eq!(handle.get_registered_hash(alice).await.unwrap(), b"alice-hash");
    assert_eq!(handle.get_registered_hash(mallory).await.unwrap(), b"forged");
}

#[tokio::test]
async fn test_student_hash_roundtrip() {
    let handle = IdentityActor::spawn_with_store(Arc::new(MemoryStore::new()), 16)
        .await
        .unwrap();
    let alice = key(1);
    let hash = student_hash("S-2024-0042");

    handle.register(alice, hash.clone().into_bytes()).await.unwrap();

    let record = handle.get_record(alice).await.unwrap().unwrap();
    assert_eq!(record.hash_str(), Some(hash.as_str()));
}

#[tokio::test]
async fn test_failed_write_keeps_previous_hash() {
    let store = Arc::new(FlakyStore::default());
    let handle = IdentityActor::spawn_with_store(store.clone(), 16)
        .await
        .unwrap();
    let alice = key(1);
    handle.register(alice, b"h1".to_vec()).await.unwrap();

    store.fail_writes();

    let err = handle.register(alice, b"h2".to_vec()).await.unwrap_err();
    assert!(matches!(err, RegistryError::Store(_)));
    assert_eq!(handle.get_registered_hash(alice).await.unwrap(), b"h1");

    let err = handle.opt_in(alice).await.unwrap_err();
    assert!(matches!(err, RegistryError::Store(_)));
    assert_eq!(handle.get_registered_hash(alice).await.unwrap(), b"h1");

    // A first-time caller gets no record at all
    assert!(handle.opt_in(key(2)).await.is_err());
    assert!(handle.get_record(key(2)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_records_survive_respawn() {
    let dir = TempDir::new().unwrap();
    let config = RegistryConfig::new(dir.path());

    let first = IdentityActor::spawn(&config).await.unwrap();
    first.register(key(1), b"h1".to_vec()).await.unwrap();
    first.opt_in(key(2)).await.unwrap();
    drop(first);

    let second = IdentityActor::spawn(&config).await.unwrap();
    assert_eq!(second.get_registered_hash(key(1)).await.unwrap(), b"h1");
    let opted = second.get_record(key(2)).await.unwrap();
    assert!(opted.is_some_and(|r| r.hash.is_empty()));
}

#[tokio::test]
async fn test_mismatched_owner_rejected_on_restore() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));

    // Record stored under key(1) but claiming key(2) as owner
    store
        .put(
            "identity",
            &key(1).storage_key("student_hash_"),
            serde_json::json!({ "owner": key(2).to_hex(), "hash": "6831" }),
        )
        .await
        .unwrap();

    let result = IdentityActor::spawn_with_store(store, 16).await;
    assert!(result.is_err());
}
