//! Identity domain types — IdentityRecord, OwnedMap, IdentityRegistry
//!
//! The registry core is synchronous and holds no I/O; the actor wraps it
//! with persistence and sequencing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::account::AccountKey;
use crate::error::{RegistryError, Result};

/// Store namespace for identity records
pub const NAMESPACE: &str = "identity";

/// Storage key prefix for identity records
pub const KEY_PREFIX: &str = "student_hash_";

/// SHA-256 of the trimmed student identifier as lowercase hex.
///
/// This is the value clients submit to `register`.
pub fn student_hash(student_id: &str) -> String {
    format!("{:x}", Sha256::digest(student_id.trim().as_bytes()))
}

/// Identity record — one per opted-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub owner: AccountKey,
    #[serde(with = "hex_bytes")]
    pub hash: Vec<u8>,
}

impl IdentityRecord {
    pub fn empty(owner: AccountKey) -> Self {
        Self {
            owner,
            hash: Vec::new(),
        }
    }

    /// Hash as text, if it is valid UTF-8
    pub fn hash_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.hash).ok()
    }

    pub fn is_registered(&self) -> bool {
        !self.hash.is_empty()
    }
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(de::Error::custom)
    }
}

// ─── Ownership-checked map ───

/// Map from account to value where only the account itself may write its entry
#[derive(Debug, Clone)]
pub struct OwnedMap<V> {
    entries: HashMap<AccountKey, V>,
}

impl<V> Default for OwnedMap<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> OwnedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes where `caller` does not own `key`
    pub fn authorize_write(caller: &AccountKey, key: &AccountKey) -> Result<()> {
        if caller != key {
            return Err(RegistryError::Unauthorized {
                caller: *caller,
                required: *key,
            });
        }
        Ok(())
    }

    /// Write `value` under `key` on behalf of `caller`. Returns the previous value.
    pub fn write(&mut self, caller: &AccountKey, key: AccountKey, value: V) -> Result<Option<V>> {
        Self::authorize_write(caller, &key)?;
        Ok(self.entries.insert(key, value))
    }

    pub fn get(&self, key: &AccountKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &AccountKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Registry core ───

/// Self-service identity registry
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    records: OwnedMap<IdentityRecord>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted records. Each record is written by its own owner.
    pub fn from_records(records: impl IntoIterator<Item = IdentityRecord>) -> Result<Self> {
        let mut registry = Self::new();
        for record in records {
            let owner = record.owner;
            registry.records.write(&owner, owner, record)?;
        }
        Ok(registry)
    }

    /// Create (or reset) the caller's record with an empty hash
    pub fn opt_in(&mut self, caller: &AccountKey) -> Result<&IdentityRecord> {
        self.put(caller, Vec::new())
    }

    /// Set the caller's hash, creating the record if needed
    pub fn register(&mut self, caller: &AccountKey, hash: Vec<u8>) -> Result<&IdentityRecord> {
        self.put(caller, hash)
    }

    /// Stored hash for `account`, empty when there is no record
    pub fn get_registered_hash(&self, account: &AccountKey) -> Vec<u8> {
        self.records
            .get(account)
            .map(|r| r.hash.clone())
            .unwrap_or_default()
    }

    pub fn get_record(&self, account: &AccountKey) -> Option<&IdentityRecord> {
        self.records.get(account)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn put(&mut self, caller: &AccountKey, hash: Vec<u8>) -> Result<&IdentityRecord> {
        let record = IdentityRecord {
            owner: *caller,
            hash,
        };
        self.records.write(caller, *caller, record)?;
        self.records
            .get(caller)
            .ok_or_else(|| RegistryError::Store(format!("identity record for {caller} vanished")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(b: u8) -> AccountKey {
        AccountKey::from_bytes([b; 32])
    }

    #[test]
    fn test_unknown_account_reads_empty() {
        let registry = IdentityRegistry::new();
        assert!(registry.get_registered_hash(&key(1)).is_empty());
        assert!(registry.get_record(&key(1)).is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = IdentityRegistry::new();
        registry.register(&key(1), b"h1".to_vec()).unwrap();
        assert_eq!(registry.get_registered_hash(&key(1)), b"h1");
        registry.register(&key(1), b"h2".to_vec()).unwrap();
        assert_eq!(registry.get_registered_hash(&key(1)), b"h2");
        assert!(registry.get_registered_hash(&key(2)).is_empty());
    }

    #[test]
    fn test_opt_in_resets_hash() {
        let mut registry = IdentityRegistry::new();
        registry.register(&key(1), b"h1".to_vec()).unwrap();
        let record = registry.opt_in(&key(1)).unwrap();
        assert!(!record.is_registered());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_owned_map_rejects_foreign_write() {
        let mut map = OwnedMap::new();
        map.write(&key(1), key(1), "mine").unwrap();

        let err = map.write(&key(2), key(1), "theirs").unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(map.get(&key(1)), Some(&"mine"));
        assert!(!map.contains(&key(2)));
    }

    #[test]
    fn test_student_hash_trims_input() {
        let hash = student_hash("  S12345 ");
        assert_eq!(hash, student_hash("S12345"));
        assert_eq!(hash.len(), 64);
        assert_eq!(
            student_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_record_serializes_hash_as_hex() {
        let record = IdentityRecord {
            owner: key(3),
            hash: b"h1".to_vec(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["hash"], "6831");
        let back: IdentityRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.hash_str(), Some("h1"));
    }
}
