//! # CampusPass Registry
//!
//! Identity and permission registries for CampusPass — a per-account student
//! hash that only its owner can write, and authority-granted access flags
//! that expire against an injected clock.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │            campuspass-registry             │
//! ├──────────────────────┬─────────────────────┤
//! │    IdentityActor     │   PermissionActor   │
//! │  (opt-in, register,  │  (grant, revoke,    │
//! │   registered hash)   │   has_permission)   │
//! ├──────────────────────┴─────────────────────┤
//! │      KvStore (MemoryStore / FileStore)     │
//! ├────────────────────────────────────────────┤
//! │   deploy: env file + <network>.json ids    │
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use campuspass_registry::clock::SystemClock;
//! use campuspass_registry::identity::{student_hash, IdentityActor};
//! use campuspass_registry::permission::PermissionActor;
//! use campuspass_registry::{AccountKey, RegistryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::new("/data/campuspass");
//!     let admin: AccountKey = "ad".repeat(32).parse()?;
//!     let student: AccountKey = "01".repeat(32).parse()?;
//!
//!     let identity = IdentityActor::spawn(&config).await?;
//!     identity.register(student, student_hash("S12345").into_bytes()).await?;
//!
//!     let permission = PermissionActor::spawn(&config, admin, Arc::new(SystemClock)).await?;
//!     permission.grant(admin, student, 1_900_000_000).await?;
//!     assert!(permission.has_permission(student).await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Self-service identity**: an identity record is only ever written by its owner
//! - **Single authority**: only the creator account may grant or revoke
//! - **Inclusive expiry**: a grant is valid while `expiry >= now`
//! - **All-or-nothing**: changes are persisted before they are applied
//! - **Railway Programming**: all operations return `Result<T, RegistryError>`

pub mod account;
pub mod clock;
pub mod config;
pub mod error;
pub mod store;

#[cfg(feature = "identity")]
pub mod identity;

#[cfg(feature = "permission")]
pub mod permission;

#[cfg(feature = "deploy")]
pub mod deploy;

// Re-exports for convenience
pub use account::AccountKey;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use store::{FileStore, KvStore, MemoryStore};

#[cfg(feature = "identity")]
pub use identity::{IdentityActor, IdentityHandle, IdentityRecord};

#[cfg(feature = "permission")]
pub use permission::{PermissionActor, PermissionHandle, PermissionRecord};

#[cfg(feature = "deploy")]
pub use deploy::{persist_app_id, read_app_id, Contract};
