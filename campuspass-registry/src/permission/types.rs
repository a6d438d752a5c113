//! Permission domain types — PermissionRecord, PermissionRegistry

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountKey;
use crate::error::{RegistryError, Result};

/// Store namespace for permission records
pub const NAMESPACE: &str = "permission";

/// Storage key prefix for permission records
pub const KEY_PREFIX: &str = "perm_";

/// Storage key holding the authority the namespace was created with
pub const AUTHORITY_KEY: &str = "creator";

/// Expiring grant for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub account: AccountKey,
    /// Unix seconds; valid while `expiry >= now`
    pub expiry: u64,
}

impl PermissionRecord {
    pub fn is_valid_at(&self, now: u64) -> bool {
        self.expiry >= now
    }

    /// Expiry as a UTC datetime, `None` if out of chrono's range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.expiry)
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

/// Authority-gated expiring permission table
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    authority: AccountKey,
    records: HashMap<AccountKey, PermissionRecord>,
}

impl PermissionRegistry {
    pub fn new(authority: AccountKey) -> Self {
        Self {
            authority,
            records: HashMap::new(),
        }
    }

    /// Rebuild from persisted records
    pub fn from_records(
        authority: AccountKey,
        records: impl IntoIterator<Item = PermissionRecord>,
    ) -> Self {
        Self {
            authority,
            records: records.into_iter().map(|r| (r.account, r)).collect(),
        }
    }

    pub fn authority(&self) -> &AccountKey {
        &self.authority
    }

    /// Reject any caller other than the authority
    pub fn authorize(&self, caller: &AccountKey) -> Result<()> {
        if *caller != self.authority {
            return Err(RegistryError::Unauthorized {
                caller: *caller,
                required: self.authority,
            });
        }
        Ok(())
    }

    /// Set `account`'s expiry, overwriting any prior grant. Past expiries are accepted.
    pub fn grant(
        &mut self,
        caller: &AccountKey,
        account: AccountKey,
        expiry: u64,
    ) -> Result<PermissionRecord> {
        self.authorize(caller)?;
        let record = PermissionRecord { account, expiry };
        self.records.insert(account, record);
        Ok(record)
    }

    /// Remove `account`'s record. Returns the removed record, if any.
    pub fn revoke(
        &mut self,
        caller: &AccountKey,
        account: &AccountKey,
    ) -> Result<Option<PermissionRecord>> {
        self.authorize(caller)?;
        Ok(self.records.remove(account))
    }

    /// Whether `account` holds a grant that has not expired at `now` (inclusive)
    pub fn has_permission(&self, account: &AccountKey, now: u64) -> bool {
        self.records
            .get(account)
            .is_some_and(|r| r.is_valid_at(now))
    }

    /// Effective expiry; 0 for accounts that were never granted
    pub fn expiry_of(&self, account: &AccountKey) -> u64 {
        self.records.get(account).map(|r| r.expiry).unwrap_or(0)
    }

    pub fn get_record(&self, account: &AccountKey) -> Option<&PermissionRecord> {
        self.records.get(account)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
