//! Network configuration loaded from `raffle.toml`.
//!
//! Networks map to chain ids; per-chain contract parameters (coordinator,
//! entrance fee, gas lane, ...) live under `[chains.<chain_id>]`. Secrets are
//! never stored in the file: RPC URLs and private keys are read from the
//! environment variables the file names.

use std::{
    collections::BTreeMap,
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use alloy_primitives::{utils::parse_ether, Address, B256, U256};
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "raffle.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_network")]
    pub default_network: String,
    /// Networks that get mocks instead of live collaborators
    #[serde(default = "default_development_chains")]
    pub development_chains: Vec<String>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Contract parameters keyed by chain id
    #[serde(default)]
    pub chains: BTreeMap<String, ChainParams>,
    #[serde(default)]
    pub named_accounts: NamedAccountIndices,
    #[serde(default)]
    pub front_end: FrontEndConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub deployments: DeploymentsConfig,
    #[serde(default)]
    pub test: TestConfig,
    /// Directory relative paths resolve against
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    /// Blocks to wait after each deployment transaction
    #[serde(default = "default_block_confirmations")]
    pub block_confirmations: u64,
    /// RPC endpoint; networks without one run in-process
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the RPC endpoint
    #[serde(default)]
    pub url_env: Option<String>,
    /// Environment variables holding private keys, in account order
    #[serde(default)]
    pub accounts_env: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainParams {
    pub name: String,
    /// Live coordinator; development networks use the deployed mock
    #[serde(default)]
    pub vrf_coordinator: Option<Address>,
    /// Decimal ether amount, e.g. `"0.01"`
    #[serde(deserialize_with = "deserialize_ether")]
    pub entrance_fee: U256,
    pub gas_lane: B256,
    #[serde(default)]
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    /// Seconds between winner picks
    pub interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NamedAccountIndices {
    pub deployer: usize,
    pub player: usize,
}

impl Default for NamedAccountIndices {
    fn default() -> Self {
        Self {
            deployer: 0,
            player: 1,
        }
    }
}

/// Files of the front-end project the exporter rewrites
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrontEndConfig {
    pub address_file: PathBuf,
    pub abi_file: PathBuf,
}

impl Default for FrontEndConfig {
    fn default() -> Self {
        Self {
            address_file: PathBuf::from("../nextjs-lottery-raffle-fe/constants/contractAddress.json"),
            abi_file: PathBuf::from("../nextjs-lottery-raffle-fe/constants/abi.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeploymentsConfig {
    pub dir: PathBuf,
}

impl Default for DeploymentsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("deployments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Ceiling for a single test, event waits included
    pub timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl TestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_network() -> String {
    "hardhat".to_string()
}

fn default_development_chains() -> Vec<String> {
    vec!["hardhat".to_string(), "localhost".to_string()]
}

fn default_block_confirmations() -> u64 {
    1
}

fn deserialize_ether<'de, D>(deserializer: D) -> std::result::Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = String::deserialize(deserializer)?;
    parse_ether(&amount).map_err(serde::de::Error::custom)
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl Config {
    /// Load a config file; relative paths inside resolve against its directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = contents.parse()?;
        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn network(&self, name: &str) -> Result<&NetworkConfig> {
        self.networks
            .get(name)
            .ok_or_else(|| Error::UnknownNetwork(name.to_string()))
    }

    pub fn is_development(&self, network: &str) -> bool {
        self.development_chains.iter().any(|n| n == network)
    }

    pub fn chain_params(&self, chain_id: u64) -> Result<&ChainParams> {
        self.chains
            .get(&chain_id.to_string())
            .ok_or(Error::MissingChainParams(chain_id))
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl NetworkConfig {
    /// RPC endpoint from `url` or `url_env`, `None` for in-process networks
    pub fn rpc_url(&self) -> Result<Option<Url>> {
        if let Some(url) = &self.url {
            return Ok(Some(url.parse()?));
        }
        match &self.url_env {
            Some(var) => {
                let url = env::var(var).map_err(|_| Error::MissingEnv(var.clone()))?;
                Ok(Some(url.parse()?))
            }
            None => Ok(None),
        }
    }

    pub fn private_keys(&self) -> Result<Vec<String>> {
        self.accounts_env
            .iter()
            .map(|var| env::var(var).map_err(|_| Error::MissingEnv(var.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [networks.hardhat]
        chain_id = 31337

        [chains.31337]
        name = "hardhat"
        entrance_fee = "0.01"
        gas_lane = "0xd89b2bf150e3b9e13446986e571fb9cab24b13cea0a43ea20a6049a85cc807cc"
        callback_gas_limit = 500000
        interval = 30
    "#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = MINIMAL.parse().unwrap();
        assert_eq!(config.default_network, "hardhat");
        assert!(config.is_development("hardhat"));
        assert!(config.is_development("localhost"));
        assert!(!config.is_development("rinkeby"));
        assert_eq!(config.network("hardhat").unwrap().block_confirmations, 1);
        assert_eq!(config.named_accounts, NamedAccountIndices::default());
        assert_eq!(config.test.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_entrance_fee_is_parsed_as_ether() {
        let config: Config = MINIMAL.parse().unwrap();
        let params = config.chain_params(31337).unwrap();
        assert_eq!(params.entrance_fee, U256::from(10_000_000_000_000_000u64));
        assert_eq!(params.vrf_coordinator, None);
        assert!(matches!(config.chain_params(4), Err(Error::MissingChainParams(4))));
    }

    #[test]
    fn test_unknown_network_is_an_error() {
        let config: Config = MINIMAL.parse().unwrap();
        assert!(matches!(config.network("mainnet"), Err(Error::UnknownNetwork(n)) if n == "mainnet"));
    }

    #[test]
    fn test_in_process_network_has_no_url() {
        let config: Config = MINIMAL.parse().unwrap();
        assert_eq!(config.network("hardhat").unwrap().rpc_url().unwrap(), None);
    }
}
