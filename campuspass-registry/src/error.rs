//! Error types for campuspass-registry — Railway Programming
//!
//! All operations return `Result<T, RegistryError>`.
//! Reads of absent records are not errors: they resolve to defaults.

use thiserror::Error;

use crate::account::AccountKey;

/// Unified error type for all registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    // ─── Authorization Errors ───

    #[error("Unauthorized: caller={caller}, required={required}")]
    Unauthorized {
        caller: AccountKey,
        required: AccountKey,
    },

    // ─── Input Errors ───

    #[error("Invalid account key: {0}")]
    InvalidAccount(String),

    #[error("Invalid app id for {key}: {value}")]
    InvalidAppId { key: String, value: String },

    // ─── Infrastructure Errors ───

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),
}

impl RegistryError {
    /// Whether this error is an authorization rejection
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Serialization(err.to_string())
    }
}

impl From<hex::FromHexError> for RegistryError {
    fn from(err: hex::FromHexError) -> Self {
        RegistryError::InvalidAccount(err.to_string())
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
