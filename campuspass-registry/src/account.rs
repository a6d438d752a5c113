//! AccountKey — fixed-length principal identifier
//!
//! Text form is 64 lowercase hex characters; serde uses the same form so
//! persisted records stay human-readable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{RegistryError, Result};

/// Length of an account key in bytes
pub const ACCOUNT_KEY_LEN: usize = 32;

/// Public-key-like account identifier. Immutable once constructed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountKey([u8; ACCOUNT_KEY_LEN]);

impl AccountKey {
    pub const fn from_bytes(bytes: [u8; ACCOUNT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Key under which this account's record is persisted, e.g. `perm_<hex>`
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.to_hex())
    }

    /// Inverse of [`storage_key`](Self::storage_key)
    pub fn from_storage_key(prefix: &str, key: &str) -> Result<Self> {
        let hex_part = key.strip_prefix(prefix).ok_or_else(|| {
            RegistryError::InvalidAccount(format!("missing prefix '{prefix}' in '{key}'"))
        })?;
        hex_part.parse()
    }
}

impl FromStr for AccountKey {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != ACCOUNT_KEY_LEN * 2 {
            return Err(RegistryError::InvalidAccount(format!(
                "expected {} hex characters, got {}",
                ACCOUNT_KEY_LEN * 2,
                s.len()
            )));
        }
        let mut bytes = [0u8; ACCOUNT_KEY_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ACCOUNT_KEY_LEN]> for AccountKey {
    fn from(bytes: [u8; ACCOUNT_KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey({})", self.to_hex())
    }
}

impl Serialize for AccountKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let key = AccountKey::from_bytes([0xab; ACCOUNT_KEY_LEN]);
        let text = key.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<AccountKey>().unwrap(), key);
    }

    #[test]
    fn test_uppercase_accepted() {
        let key: AccountKey = "AB".repeat(32).parse().unwrap();
        assert_eq!(key, AccountKey::from_bytes([0xab; ACCOUNT_KEY_LEN]));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("abcd".parse::<AccountKey>().is_err());
        assert!("zz".repeat(32).parse::<AccountKey>().is_err());
    }

    #[test]
    fn test_storage_key() {
        let key = AccountKey::from_bytes([1; ACCOUNT_KEY_LEN]);
        let stored = key.storage_key("perm_");
        assert!(stored.starts_with("perm_01"));
        assert_eq!(AccountKey::from_storage_key("perm_", &stored).unwrap(), key);
        assert!(AccountKey::from_storage_key("other_", &stored).is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let key = AccountKey::from_bytes([2; ACCOUNT_KEY_LEN]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "02".repeat(32)));
        let parsed: AccountKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }
}
