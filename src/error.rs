// Raffle deployment tooling - Errors
use std::{path::PathBuf, time::Duration};

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::raffle_error::Revert;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("unknown network `{0}`")]
    UnknownNetwork(String),

    #[error("no chain parameters for chain id {0}")]
    MissingChainParams(u64),

    #[error("no VRF coordinator configured for chain id {0}")]
    MissingCoordinator(u64),

    #[error("environment variable `{0}` is not set")]
    MissingEnv(String),

    #[error("no deployment named `{name}` on network `{network}`")]
    MissingDeployment { network: String, name: String },

    #[error("no artifact for contract `{0}`")]
    MissingArtifact(String),

    #[error("contract `{0}` cannot run on the in-process network")]
    UnsupportedContract(String),

    #[error("no signer at account index {0}")]
    MissingSigner(usize),

    #[error("fixtures need the in-process network, `{0}` is remote")]
    FixtureUnsupported(String),

    #[error("insufficient funds: {account} holds {balance}, needs {required}")]
    InsufficientFunds {
        account: Address,
        balance: U256,
        required: U256,
    },

    #[error("invalid raffle state {0}")]
    InvalidRaffleState(u8),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("transaction reverted: {0}")]
    Reverted(Revert),

    #[error("contract storage is corrupt: {0}")]
    Storage(#[source] std::io::Error),

    #[error("ABI decoding failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("RPC request failed: {0}")]
    Rpc(#[from] alloy_transport::TransportError),

    #[error("pending transaction failed: {0}")]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),

    #[error("invalid private key: {0}")]
    Signer(#[from] alloy_signer_local::LocalSignerError),

    #[error("invalid RPC URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("timed out after {timeout:?} waiting for `{event}`")]
    Timeout { event: String, timeout: Duration },

    #[error("subscription closed before `{0}` fired")]
    SubscriptionClosed(String),
}

impl Error {
    /// Revert data when the error is a reverted transaction or call
    pub fn revert(&self) -> Option<&Revert> {
        match self {
            Error::Reverted(revert) => Some(revert),
            _ => None,
        }
    }

    /// Decoded failure name of a revert, as compared by revert assertions
    pub fn revert_reason(&self) -> Option<String> {
        self.revert().and_then(Revert::reason)
    }
}

impl From<Revert> for Error {
    fn from(revert: Revert) -> Self {
        Error::Reverted(revert)
    }
}
