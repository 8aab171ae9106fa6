//! Contract artifacts: name, ABI and creation bytecode.

use std::{fs, path::PathBuf};

use alloy_json_abi::JsonAbi;
use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    bindings::{IRaffle, VRFCoordinatorV2Mock},
    error::{Error, Result},
    raffle_processor, vrf,
};

/// Compiled contract as written by the Solidity toolchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub abi: JsonAbi,
    /// Creation code, empty for contracts hosted natively
    #[serde(default)]
    pub bytecode: Bytes,
}

/// Where artifacts come from
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// Built-in ABIs of the contracts the in-process network hosts
    Native,
    /// `<dir>/<ContractName>.json` files
    Directory(PathBuf),
}

impl ArtifactSource {
    pub fn artifact(&self, name: &str) -> Result<Artifact> {
        match self {
            ArtifactSource::Native => {
                let abi = match name {
                    raffle_processor::CONTRACT_NAME => IRaffle::abi::contract(),
                    vrf::CONTRACT_NAME => VRFCoordinatorV2Mock::abi::contract(),
                    _ => return Err(Error::MissingArtifact(name.to_string())),
                };
                Ok(Artifact {
                    contract_name: name.to_string(),
                    abi,
                    bytecode: Bytes::new(),
                })
            }
            ArtifactSource::Directory(dir) => {
                let path = dir.join(format!("{name}.json"));
                let contents = fs::read_to_string(&path).map_err(|source| match source.kind() {
                    std::io::ErrorKind::NotFound => Error::MissingArtifact(name.to_string()),
                    _ => Error::Io {
                        path: path.clone(),
                        source,
                    },
                })?;
                serde_json::from_str(&contents).map_err(|source| Error::Json { path, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_raffle_abi_lists_the_interface() {
        let artifact = ArtifactSource::Native.artifact("Raffle").unwrap();
        assert!(artifact.bytecode.is_empty());
        assert!(artifact.abi.function("getRalleState").is_some());
        assert!(artifact.abi.event("WinnerPicked").is_some());
        assert!(artifact.abi.error("Raffle__UpkeepNotNeeded").is_some());
    }

    #[test]
    fn test_unknown_contract_has_no_artifact() {
        let err = ArtifactSource::Native.artifact("Lottery").unwrap_err();
        assert!(matches!(err, Error::MissingArtifact(name) if name == "Lottery"));
    }

    #[test]
    fn test_directory_artifact_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"{
            "contractName": "Raffle",
            "abi": [{"type":"function","name":"getEntranceFee","inputs":[],"outputs":[{"name":"","type":"uint256","internalType":"uint256"}],"stateMutability":"view"}],
            "bytecode": "0x6080"
        }"#;
        std::fs::write(dir.path().join("Raffle.json"), json).unwrap();

        let artifact = ArtifactSource::Directory(dir.path().to_path_buf())
            .artifact("Raffle")
            .unwrap();
        assert_eq!(&artifact.bytecode[..], &[0x60u8, 0x80][..]);
        assert!(artifact.abi.function("getEntranceFee").is_some());
    }
}
