//! The seam between the tooling and a network.
//!
//! [`Chain`] is implemented by the in-process [`LocalChain`](crate::LocalChain)
//! and by the JSON-RPC backed [`LiveChain`](crate::LiveChain). Scripts, typed
//! clients and the event harness only ever see this trait.

use std::fmt;

use alloy_primitives::{Address, Bytes, Log, B256, U256};
use async_trait::async_trait;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::warn;

use crate::{artifacts::Artifact, contract::ContractEvent, error::Result};

/// A call or transaction against a deployed contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

impl CallRequest {
    pub fn new(from: Address, to: Address, input: impl Into<Bytes>) -> Self {
        Self {
            from,
            to,
            value: U256::ZERO,
            input: input.into(),
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Address of the created contract for deployments
    pub contract_address: Option<Address>,
    /// Logs in emission order
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Decode every log of the receipt that belongs to `E`, in emission order
    pub fn events<E: ContractEvent>(&self) -> Vec<E> {
        self.logs.iter().filter_map(E::decode).collect()
    }
}

#[async_trait]
pub trait Chain: Send + Sync + fmt::Debug {
    fn chain_id(&self) -> u64;

    /// Accounts the chain can sign for, indexed like the named accounts
    fn signers(&self) -> &[Address];

    async fn block_number(&self) -> Result<u64>;

    async fn balance(&self, account: Address) -> Result<U256>;

    /// Execute without committing (`eth_call`)
    async fn call(&self, request: CallRequest) -> Result<Bytes>;

    /// Sign and submit, then wait for `confirmations` blocks
    async fn send(&self, request: CallRequest, confirmations: u64) -> Result<Receipt>;

    async fn deploy(
        &self,
        from: Address,
        artifact: &Artifact,
        constructor_args: Bytes,
        confirmations: u64,
    ) -> Result<Receipt>;

    /// Start receiving logs emitted by `address`. The subscription is live
    /// when the returned future completes.
    async fn subscribe(&self, address: Address) -> Result<LogSubscription>;
}

/// Live feed of logs emitted by one contract address
#[derive(Debug)]
pub struct LogSubscription {
    inner: Feed,
}

#[derive(Debug)]
enum Feed {
    Broadcast {
        receiver: broadcast::Receiver<Log>,
        address: Address,
    },
    Polling {
        receiver: mpsc::UnboundedReceiver<Log>,
        task: JoinHandle<()>,
    },
    Cancelled,
}

impl LogSubscription {
    pub(crate) fn broadcast(receiver: broadcast::Receiver<Log>, address: Address) -> Self {
        Self {
            inner: Feed::Broadcast { receiver, address },
        }
    }

    pub(crate) fn polling(receiver: mpsc::UnboundedReceiver<Log>, task: JoinHandle<()>) -> Self {
        Self {
            inner: Feed::Polling { receiver, task },
        }
    }

    /// Next log, or `None` once the subscription is cancelled or its source is gone
    pub async fn recv(&mut self) -> Option<Log> {
        match &mut self.inner {
            Feed::Broadcast { receiver, address } => loop {
                match receiver.recv().await {
                    Ok(log) if log.address == *address => return Some(log),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "log subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
            Feed::Polling { receiver, .. } => receiver.recv().await,
            Feed::Cancelled => None,
        }
    }

    /// Stop delivery and release the underlying listener
    pub fn cancel(&mut self) {
        if let Feed::Polling { task, .. } = &self.inner {
            task.abort();
        }
        self.inner = Feed::Cancelled;
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.inner, Feed::Cancelled)
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
