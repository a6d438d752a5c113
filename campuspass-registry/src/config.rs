//! Configuration for CampusPass registries and deployment glue

use std::path::{Path, PathBuf};

/// Network used when `ALGOD_NETWORK` is unset or blank
pub const DEFAULT_NETWORK: &str = "testnet";

/// Prefix for app-id keys in the consumer env file
pub const DEFAULT_ENV_PREFIX: &str = "VITE";

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Root path for registry state and deployment records
    pub base_path: PathBuf,

    /// Directory holding one JSON file per registry namespace
    pub state_dir: PathBuf,

    /// Consumer-facing env file that receives `<PREFIX>_<NAME>_APP_ID` lines
    pub env_file: PathBuf,

    /// Prefix for env keys (default: `VITE`)
    pub env_prefix: String,

    /// Directory holding `<network>.json` deployment records
    pub deployments_dir: PathBuf,

    /// Network name, lower-cased
    pub network: String,

    /// Mailbox capacity for each registry actor
    pub channel_capacity: usize,
}

impl RegistryConfig {
    /// Create config with sensible defaults
    ///
    /// # Arguments
    /// * `base_path` - Root directory. Structure used:
    ///   ```text
    ///   base_path/
    ///   ├── state/             (identity.json, permission.json)
    ///   ├── deployments/       (<network>.json)
    ///   └── .env.local         (consumer app ids)
    ///   ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        let base_path = base_path.as_ref().to_path_buf();
        Self {
            state_dir: base_path.join("state"),
            env_file: base_path.join(".env.local"),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            deployments_dir: base_path.join("deployments"),
            network: normalize_network(std::env::var("ALGOD_NETWORK").ok().as_deref()),
            channel_capacity: 256,
            base_path,
        }
    }

    /// Override the env file path
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = path.into();
        self
    }

    /// Override the env key prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Override the deployments directory
    pub fn with_deployments_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.deployments_dir = dir.into();
        self
    }

    /// Override the network (normalized the same way as `ALGOD_NETWORK`)
    pub fn with_network(mut self, network: &str) -> Self {
        self.network = normalize_network(Some(network));
        self
    }

    /// Override actor mailbox capacity (minimum 1)
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Path of the deployment record for the configured network
    pub fn deployment_file(&self) -> PathBuf {
        self.deployments_dir.join(format!("{}.json", self.network))
    }
}

fn normalize_network(raw: Option<&str>) -> String {
    let network = raw.unwrap_or("").trim().to_lowercase();
    if network.is_empty() {
        DEFAULT_NETWORK.to_string()
    } else {
        network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let cfg = RegistryConfig::new("/tmp/campuspass").with_network("testnet");
        assert_eq!(cfg.state_dir, PathBuf::from("/tmp/campuspass/state"));
        assert_eq!(cfg.env_file, PathBuf::from("/tmp/campuspass/.env.local"));
        assert_eq!(cfg.env_prefix, "VITE");
        assert_eq!(
            cfg.deployment_file(),
            PathBuf::from("/tmp/campuspass/deployments/testnet.json")
        );
    }

    #[test]
    fn test_builder_pattern() {
        let cfg = RegistryConfig::new("/data")
            .with_env_file("/frontend/.env")
            .with_env_prefix("NEXT")
            .with_network("  MainNet ")
            .with_channel_capacity(0);

        assert_eq!(cfg.env_file, PathBuf::from("/frontend/.env"));
        assert_eq!(cfg.env_prefix, "NEXT");
        assert_eq!(cfg.network, "mainnet");
        assert_eq!(cfg.channel_capacity, 1);
    }

    #[test]
    fn test_blank_network_falls_back() {
        assert_eq!(normalize_network(Some("   ")), DEFAULT_NETWORK);
        assert_eq!(normalize_network(None), DEFAULT_NETWORK);
        assert_eq!(normalize_network(Some("LocalNet")), "localnet");
    }
}
