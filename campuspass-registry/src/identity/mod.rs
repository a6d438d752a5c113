//! Identity module — per-account student hash, writable only by its owner

pub mod types;
pub mod actor;

pub use actor::{IdentityActor, IdentityHandle};
pub use types::{student_hash, IdentityRecord, IdentityRegistry, OwnedMap};
