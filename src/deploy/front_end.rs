// 99 - Publish the Raffle address and ABI to the front-end project
use std::{env, fs, path::Path};

use alloy_json_abi::JsonAbi;
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{DeployEnvironment, DeployScript};
use crate::{
    error::{Error, Result},
    raffle_processor,
};

/// Environment variable that opts in to the export
pub const UPDATE_FRONT_END_ENV: &str = "UPDATE_FRONT_END";

/// Chain id to deployed addresses, as read by the front end. Keys keep
/// their file order.
pub type AddressRegistry = serde_json::Map<String, Value>;

/// Whether `UPDATE_FRONT_END` is set to a non-empty value
pub fn update_requested() -> bool {
    env::var_os(UPDATE_FRONT_END_ENV).is_some_and(|value| !value.is_empty())
}

pub struct UpdateFrontEnd;

#[async_trait]
impl DeployScript for UpdateFrontEnd {
    fn id(&self) -> &'static str {
        "99-update-front-end"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["all", "frontend"]
    }

    async fn run(&self, env: &mut DeployEnvironment) -> Result<()> {
        if !env.update_front_end() {
            return Ok(());
        }
        info!("Updating front end");
        let files = env.front_end_files();
        let raffle = env.deployments().get(raffle_processor::CONTRACT_NAME)?;
        update_contract_address(&files.address_file, env.chain_id(), raffle.address)?;
        update_abi(&files.abi_file, &raffle.abi)?;
        info!(
            addresses = %files.address_file.display(),
            abi = %files.abi_file.display(),
            "Front end updated"
        );
        Ok(())
    }
}

/// Merge `address` into the registry list of `chain_id`.
///
/// The file must exist and hold a JSON object, and the entry for `chain_id`
/// must be a list of strings when present. Other entries are kept as they
/// are. Addresses are compared case-insensitively and written checksummed;
/// the file is rewritten as compact JSON.
pub fn update_contract_address(path: &Path, chain_id: u64, address: Address) -> Result<()> {
    let contents = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut registry: AddressRegistry =
        serde_json::from_str(&contents).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let key = chain_id.to_string();
    let mut addresses = match registry.get(&key) {
        Some(entry) => Vec::<String>::deserialize(entry).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?,
        None => Vec::new(),
    };
    let address = address.to_checksum(None);
    if !addresses.iter().any(|known| known.eq_ignore_ascii_case(&address)) {
        addresses.push(address);
    }
    registry.insert(key, Value::from(addresses));

    let json = serde_json::to_string(&registry).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Overwrite the ABI file with `abi` as JSON
pub fn update_abi(path: &Path, abi: &JsonAbi) -> Result<()> {
    let json = serde_json::to_string(abi).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns the variable so parallel tests never race on it
    #[test]
    fn test_update_requested_follows_env() {
        env::remove_var(UPDATE_FRONT_END_ENV);
        assert!(!update_requested());

        env::set_var(UPDATE_FRONT_END_ENV, "");
        assert!(!update_requested());

        env::set_var(UPDATE_FRONT_END_ENV, "true");
        assert!(update_requested());

        // Any non-empty value opts in
        env::set_var(UPDATE_FRONT_END_ENV, "0");
        assert!(update_requested());

        env::remove_var(UPDATE_FRONT_END_ENV);
    }
}
