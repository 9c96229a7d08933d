//! Node configuration.

use crate::types::{Address, SECONDS_PER_DAY};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Marketplace node configuration, loadable from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Directory for persisted state
    pub data_dir: String,
    /// Account the contract itself holds value under while a call settles
    pub contract_address: Address,
    /// Deployer; sole wallet allowed to call the emergency sweep
    pub contract_owner: Address,
    /// Rental day length in seconds; only tests override this
    pub seconds_per_day: u64,
    /// Balances credited once at first boot
    pub genesis_balances: HashMap<Address, u128>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/marketplace".to_string(),
            contract_address: Address::from_low_u64(1),
            contract_owner: Address::from_low_u64(0x10),
            seconds_per_day: SECONDS_PER_DAY,
            genesis_balances: HashMap::new(),
        }
    }
}

impl NodeConfig {
    /// Load a configuration from a YAML file. Missing keys fall back to the
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Path of the persisted state file under `data_dir`.
    pub fn state_file(&self) -> PathBuf {
        Path::new(&self.data_dir).join("state.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.seconds_per_day, SECONDS_PER_DAY);
        assert_eq!(config.contract_address, Address::from_low_u64(1));
        assert!(config.genesis_balances.is_empty());
        assert!(config.state_file().ends_with("state.json"));
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let config: NodeConfig = serde_yaml::from_str("data_dir: /tmp/mkt\n").unwrap();
        assert_eq!(config.data_dir, "/tmp/mkt");
        assert_eq!(config.seconds_per_day, SECONDS_PER_DAY);
    }

    #[test]
    fn test_yaml_with_genesis_balances() {
        let yaml = r#"
contract_owner: "0x0000000000000000000000000000000000000099"
genesis_balances:
  "0x0000000000000000000000000000000000000002": 1000000000000000000
"#;
        let config: NodeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.contract_owner, Address::from_low_u64(0x99));
        assert_eq!(
            config.genesis_balances[&Address::from_low_u64(2)],
            1_000_000_000_000_000_000
        );
    }
}
