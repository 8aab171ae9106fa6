//! Deployment bookkeeping, one record per contract name.
//!
//! Live networks persist records as `deployments/<network>/<Name>.json` next
//! to a `.chainId` file; the in-process network keeps them in memory.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

const CHAIN_ID_FILE: &str = ".chainId";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: Address,
    pub abi: JsonAbi,
    /// ABI-encoded constructor arguments
    #[serde(default)]
    pub args: Bytes,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Deployments {
    network: String,
    dir: Option<PathBuf>,
    records: BTreeMap<String, Deployment>,
}

impl Deployments {
    pub fn in_memory(network: &str) -> Self {
        Self {
            network: network.to_string(),
            dir: None,
            records: BTreeMap::new(),
        }
    }

    /// Load the records of `network` under `root`, creating the directory
    pub fn open(root: &Path, network: &str, chain_id: u64) -> Result<Self> {
        let dir = root.join(network);
        fs::create_dir_all(&dir).map_err(|source| Error::Io {
            path: dir.clone(),
            source,
        })?;
        let chain_id_path = dir.join(CHAIN_ID_FILE);
        fs::write(&chain_id_path, chain_id.to_string()).map_err(|source| Error::Io {
            path: chain_id_path,
            source,
        })?;

        let entries = fs::read_dir(&dir).map_err(|source| Error::Io {
            path: dir.clone(),
            source,
        })?;
        let mut records = BTreeMap::new();
        for entry in entries {
            let path = entry
                .map_err(|source| Error::Io {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let contents = fs::read_to_string(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            let deployment = serde_json::from_str(&contents)
                .map_err(|source| Error::Json { path, source })?;
            records.insert(name, deployment);
        }
        debug!(network, count = records.len(), "loaded deployments");

        Ok(Self {
            network: network.to_string(),
            dir: Some(dir),
            records,
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn save(&mut self, name: &str, deployment: Deployment) -> Result<()> {
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{name}.json"));
            let json = serde_json::to_string_pretty(&deployment).map_err(|source| Error::Json {
                path: path.clone(),
                source,
            })?;
            fs::write(&path, json).map_err(|source| Error::Io { path, source })?;
        }
        self.records.insert(name.to_string(), deployment);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Deployment> {
        self.records.get(name).ok_or_else(|| Error::MissingDeployment {
            network: self.network.clone(),
            name: name.to_string(),
        })
    }

    pub fn find(&self, name: &str) -> Option<&Deployment> {
        self.records.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Deployment)> {
        self.records.iter().map(|(name, d)| (name.as_str(), d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment() -> Deployment {
        Deployment {
            address: Address::repeat_byte(7),
            abi: JsonAbi::new(),
            args: Bytes::new(),
            transaction_hash: None,
            block_number: Some(1),
        }
    }

    #[test]
    fn test_missing_record_names_network() {
        let deployments = Deployments::in_memory("hardhat");
        let err = deployments.get("Raffle").unwrap_err();
        assert_eq!(err.to_string(), "no deployment named `Raffle` on network `hardhat`");
    }

    #[test]
    fn test_records_persist_across_opens() {
        let root = tempfile::tempdir().unwrap();
        let mut deployments = Deployments::open(root.path(), "rinkeby", 4).unwrap();
        deployments.save("Raffle", deployment()).unwrap();

        let chain_id = fs::read_to_string(root.path().join("rinkeby").join(CHAIN_ID_FILE)).unwrap();
        assert_eq!(chain_id, "4");

        let reopened = Deployments::open(root.path(), "rinkeby", 4).unwrap();
        assert_eq!(reopened.get("Raffle").unwrap(), &deployment());
    }
}
