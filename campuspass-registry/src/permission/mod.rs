//! Permission module — authority-granted, time-bounded access flags

pub mod types;
pub mod actor;

pub use actor::{PermissionActor, PermissionHandle};
pub use types::{PermissionRecord, PermissionRegistry};
