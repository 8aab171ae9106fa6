//! JSON-RPC network access through alloy.

use std::{fmt, time::Duration};

use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, Log, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{Filter, TransactionReceipt, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    artifacts::Artifact,
    chain::{CallRequest, Chain, LogSubscription, Receipt},
    error::{Error, Result},
    raffle_error::Revert,
};

/// How often log subscriptions poll the node
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

#[derive(Clone)]
pub struct LiveChain {
    provider: DynProvider,
    chain_id: u64,
    signers: Vec<Address>,
    poll_interval: Duration,
}

impl fmt::Debug for LiveChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveChain")
            .field("chain_id", &self.chain_id)
            .field("signers", &self.signers)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl LiveChain {
    /// Connect to `url`, signing with `private_keys` in account order
    pub async fn connect(url: Url, private_keys: &[String]) -> Result<Self> {
        let signers = private_keys
            .iter()
            .map(|key| key.trim().parse::<PrivateKeySigner>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let addresses: Vec<Address> = signers.iter().map(|s| s.address()).collect();

        let provider = match signers.split_first() {
            Some((first, rest)) => {
                let mut wallet = EthereumWallet::from(first.clone());
                for signer in rest {
                    wallet.register_signer(signer.clone());
                }
                ProviderBuilder::new().wallet(wallet).connect_http(url.clone()).erased()
            }
            None => ProviderBuilder::new().connect_http(url.clone()).erased(),
        };

        let chain_id = provider.get_chain_id().await?;
        info!(%url, chain_id, signers = addresses.len(), "connected to network");
        Ok(Self {
            provider,
            chain_id,
            signers: addresses,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    async fn submit(&self, tx: TransactionRequest, confirmations: u64) -> Result<TransactionReceipt> {
        let pending = self.provider.send_transaction(tx).await.map_err(rpc_error)?;
        debug!(tx = %pending.tx_hash(), confirmations, "waiting for transaction");
        let receipt = pending
            .with_required_confirmations(confirmations.max(1))
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(Error::Reverted(Revert::default()));
        }
        Ok(receipt)
    }
}

/// Surface revert data carried by a JSON-RPC error response
fn rpc_error(err: TransportError) -> Error {
    match err.as_error_resp().and_then(|payload| payload.as_revert_data()) {
        Some(data) => Error::Reverted(Revert::new(data)),
        None => Error::Rpc(err),
    }
}

fn into_receipt(receipt: TransactionReceipt) -> Receipt {
    Receipt {
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or_default(),
        contract_address: receipt.contract_address,
        logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
    }
}

fn transaction_request(request: &CallRequest) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(request.from)
        .with_to(request.to)
        .with_value(request.value)
        .with_input(request.input.clone())
}

/// Forward logs of `address` from `from_block` on until the receiver is dropped
async fn poll_logs(
    provider: DynProvider,
    address: Address,
    mut from_block: u64,
    interval: Duration,
    sender: mpsc::UnboundedSender<Log>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if sender.is_closed() {
            return;
        }
        let latest = match provider.get_block_number().await {
            Ok(latest) => latest,
            Err(err) => {
                warn!(%err, "failed to poll block number");
                continue;
            }
        };
        if latest < from_block {
            continue;
        }
        let filter = Filter::new().address(address).from_block(from_block).to_block(latest);
        match provider.get_logs(&filter).await {
            Ok(logs) => {
                for log in logs {
                    if sender.send(log.inner).is_err() {
                        return;
                    }
                }
                from_block = latest + 1;
            }
            Err(err) => warn!(%err, from_block, latest, "failed to poll logs"),
        }
    }
}

#[async_trait]
impl Chain for LiveChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signers(&self) -> &[Address] {
        &self.signers
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        Ok(self.provider.get_balance(account).await?)
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes> {
        self.provider
            .call(transaction_request(&request))
            .await
            .map_err(rpc_error)
    }

    async fn send(&self, request: CallRequest, confirmations: u64) -> Result<Receipt> {
        let receipt = self.submit(transaction_request(&request), confirmations).await?;
        Ok(into_receipt(receipt))
    }

    async fn deploy(
        &self,
        from: Address,
        artifact: &Artifact,
        constructor_args: Bytes,
        confirmations: u64,
    ) -> Result<Receipt> {
        if artifact.bytecode.is_empty() {
            return Err(Error::MissingArtifact(artifact.contract_name.clone()));
        }
        let code = [artifact.bytecode.as_ref(), constructor_args.as_ref()].concat();
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(code);
        let receipt = self.submit(tx, confirmations).await?;
        Ok(into_receipt(receipt))
    }

    async fn subscribe(&self, address: Address) -> Result<LogSubscription> {
        let from_block = self.provider.get_block_number().await? + 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(poll_logs(
            self.provider.clone(),
            address,
            from_block,
            self.poll_interval,
            sender,
        ));
        debug!(%address, from_block, "polling logs");
        Ok(LogSubscription::polling(receiver, task))
    }
}
