//! Deployment glue — publish registry app ids to consumers
//!
//! After a registry is instantiated, its numeric app id is upserted into:
//! - the consumer env file as `<PREFIX>_<CONTRACT>_APP_ID=<id>`
//! - `<deployments_dir>/<network>.json` as `"<contract>_app_id": <id>`
//!
//! Both writes are idempotent key upserts; other lines and keys are kept.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};

/// Registries that get deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    Identity,
    Permission,
}

impl Contract {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Permission => "permission",
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an app id was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAppId {
    pub env_key: String,
    pub env_file: PathBuf,
    pub deployment_key: String,
    pub deployment_file: PathBuf,
    pub app_id: u64,
}

/// `<PREFIX>_<CONTRACT>_APP_ID`, upper-cased
pub fn env_key(prefix: &str, contract: Contract) -> String {
    format!(
        "{}_{}_APP_ID",
        prefix.to_uppercase(),
        contract.as_str().to_uppercase()
    )
}

/// `<contract>_app_id`
pub fn deployment_key(contract: Contract) -> String {
    format!("{contract}_app_id")
}

/// Replace every `key=` line in the env file, or append one. Creates the file.
pub async fn update_env_file(path: &Path, key: &str, value: &str) -> Result<()> {
    create_parent(path).await?;

    let existing = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let prefix = format!("{key}=");
    let entry = format!("{key}={value}");
    let mut updated = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if line.starts_with(&prefix) {
                updated = true;
                entry.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !updated {
        lines.push(entry);
    }

    let mut body = lines.join("\n");
    body.push('\n');
    tokio::fs::write(path, body).await?;

    debug!(path = %path.display(), key, updated, "Env file written");
    Ok(())
}

/// Set `"<contract>_app_id": app_id` in a JSON object file.
///
/// Existing keys keep their order; a new key is appended.
pub async fn merge_deployment_file(path: &Path, contract: Contract, app_id: u64) -> Result<()> {
    create_parent(path).await?;

    let mut data = match tokio::fs::read_to_string(path).await {
        Ok(text) if text.trim().is_empty() => Map::new(),
        Ok(text) => match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => map,
            other => {
                return Err(RegistryError::Config(format!(
                    "deployment file {} holds {} instead of an object",
                    path.display(),
                    json_kind(&other)
                )))
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
        Err(e) => return Err(e.into()),
    };

    data.insert(deployment_key(contract), Value::from(app_id));

    let mut body = serde_json::to_string_pretty(&Value::Object(data))?;
    body.push('\n');
    tokio::fs::write(path, body).await?;

    debug!(path = %path.display(), %contract, app_id, "Deployment file written");
    Ok(())
}

/// Publish `app_id` to the configured env file and network deployment file
pub async fn persist_app_id(
    config: &RegistryConfig,
    contract: Contract,
    app_id: u64,
) -> Result<PersistedAppId> {
    let key = env_key(&config.env_prefix, contract);
    update_env_file(&config.env_file, &key, &app_id.to_string()).await?;

    let deployment_file = config.deployment_file();
    merge_deployment_file(&deployment_file, contract, app_id).await?;

    info!(
        %contract,
        app_id,
        network = %config.network,
        "Registry app id persisted"
    );

    Ok(PersistedAppId {
        env_key: key,
        env_file: config.env_file.clone(),
        deployment_key: deployment_key(contract),
        deployment_file,
        app_id,
    })
}

/// Read an app id back from an env file
///
/// Missing file, missing key, or empty value → `None`. Anything that is not
/// a positive integer → `InvalidAppId`.
pub async fn read_app_id(path: &Path, key: &str) -> Result<Option<u64>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let prefix = format!("{key}=");
    let raw = match text.lines().rev().find_map(|line| line.strip_prefix(&prefix)) {
        Some(raw) => raw.trim(),
        None => return Ok(None),
    };
    if raw.is_empty() {
        return Ok(None);
    }

    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(Some(id)),
        _ => Err(RegistryError::InvalidAppId {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

async fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("VITE", Contract::Identity), "VITE_IDENTITY_APP_ID");
        assert_eq!(env_key("vite", Contract::Permission), "VITE_PERMISSION_APP_ID");
    }

    #[test]
    fn test_deployment_key() {
        assert_eq!(deployment_key(Contract::Identity), "identity_app_id");
        assert_eq!(Contract::Identity.to_string(), "identity");
    }
}
