//! In-process development network.
//!
//! A single-node chain with funded developer accounts, deterministic block
//! timestamps, time travel and snapshots. Transactions are atomic: every call
//! frame checkpoints the account set and rolls back when it fails. Contracts
//! are native programs keyed by contract name, so the Raffle and the VRF
//! coordinator mock run here without bytecode.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use alloy_primitives::{address, keccak256, Address, Bytes, Log, LogData, B256, U256};
use async_trait::async_trait;
use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    artifacts::Artifact,
    chain::{CallRequest, Chain, LogSubscription, Receipt},
    error::{Error, Result},
    raffle_error::{CoordinatorError, RaffleError, Revert},
    raffle_processor, vrf,
};

/// Chain id of the in-process network
pub const HARDHAT_CHAIN_ID: u64 = 31337;

/// Timestamp of the genesis block
pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Developer accounts, funded at genesis
pub const DEV_ACCOUNTS: [Address; 10] = [
    address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
    address!("70997970c51812dc3a010c7d01b50e0d17dc79c8"),
    address!("3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
    address!("90f79bf6eb2c4f870365e785982e1f101e93b906"),
    address!("15d34aaf54267db7d7c367839aaf71a00a2c6a65"),
    address!("9965507d1a55bcc2695c58ba16fb37d819b0a4dc"),
    address!("976ea74026e726554db657fa54763abd0c3a0aa9"),
    address!("14dc79964da2c08b23698b3d3cc7ca32193d9955"),
    address!("23618e81e3f5cdf7f54c3d65f7fbc0abf5b21e8f"),
    address!("a0ee7a142d267c1f36714e4a8f75612f20a79720"),
];

const LOG_CHANNEL_CAPACITY: usize = 1024;

/// 10000 ether per developer account
pub fn dev_account_balance() -> U256 {
    U256::from(10_000u64) * U256::from(10u64).pow(U256::from(18u64))
}

pub type ProcessResult = std::result::Result<Vec<u8>, ExecutionError>;

/// Failure inside a call frame
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{0}")]
    Revert(Revert),

    #[error("insufficient funds: {account} holds {balance}, needs {required}")]
    InsufficientFunds {
        account: Address,
        balance: U256,
        required: U256,
    },

    #[error("contract storage is corrupt: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<Revert> for ExecutionError {
    fn from(revert: Revert) -> Self {
        ExecutionError::Revert(revert)
    }
}

impl From<RaffleError> for ExecutionError {
    fn from(e: RaffleError) -> Self {
        ExecutionError::Revert(e.into())
    }
}

impl From<CoordinatorError> for ExecutionError {
    fn from(e: CoordinatorError) -> Self {
        ExecutionError::Revert(e.into())
    }
}

// Undecodable calldata reverts without data, like a missing selector.
impl From<alloy_sol_types::Error> for ExecutionError {
    fn from(_: alloy_sol_types::Error) -> Self {
        ExecutionError::Revert(Revert::default())
    }
}

impl From<ExecutionError> for Error {
    fn from(e: ExecutionError) -> Self {
        match e {
            ExecutionError::Revert(revert) => Error::Reverted(revert),
            ExecutionError::InsufficientFunds {
                account,
                balance,
                required,
            } => Error::InsufficientFunds {
                account,
                balance,
                required,
            },
            ExecutionError::Storage(source) => Error::Storage(source),
        }
    }
}

/// Contracts the in-process network can host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeProgram {
    VrfCoordinatorMock,
    Raffle,
}

impl NativeProgram {
    pub fn from_contract_name(name: &str) -> Option<Self> {
        match name {
            vrf::CONTRACT_NAME => Some(NativeProgram::VrfCoordinatorMock),
            raffle_processor::CONTRACT_NAME => Some(NativeProgram::Raffle),
            _ => None,
        }
    }

    pub fn contract_name(self) -> &'static str {
        match self {
            NativeProgram::VrfCoordinatorMock => vrf::CONTRACT_NAME,
            NativeProgram::Raffle => raffle_processor::CONTRACT_NAME,
        }
    }

    fn construct(self, ctx: &mut InvokeContext<'_, '_>, args: &[u8]) -> ProcessResult {
        match self {
            NativeProgram::VrfCoordinatorMock => vrf::CoordinatorProcessor::construct(ctx, args),
            NativeProgram::Raffle => raffle_processor::Processor::construct(ctx, args),
        }
    }

    fn process(self, ctx: &mut InvokeContext<'_, '_>, input: &[u8]) -> ProcessResult {
        match self {
            NativeProgram::VrfCoordinatorMock => vrf::CoordinatorProcessor::process(ctx, input),
            NativeProgram::Raffle => raffle_processor::Processor::process(ctx, input),
        }
    }
}

/// Number and timestamp of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEnv {
    pub number: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default)]
struct Account {
    balance: U256,
    nonce: u64,
    program: Option<NativeProgram>,
    storage: Vec<u8>,
}

#[derive(Debug, Clone)]
struct ChainState {
    block: BlockEnv,
    /// Seconds added by `increase_time` since the last block
    pending_time: u64,
    accounts: HashMap<Address, Account>,
}

impl ChainState {
    fn genesis() -> Self {
        let accounts = DEV_ACCOUNTS
            .iter()
            .map(|address| {
                let account = Account {
                    balance: dev_account_balance(),
                    ..Account::default()
                };
                (*address, account)
            })
            .collect();
        Self {
            block: BlockEnv {
                number: 0,
                timestamp: GENESIS_TIMESTAMP,
            },
            pending_time: 0,
            accounts,
        }
    }

    fn next_block(&self) -> BlockEnv {
        BlockEnv {
            number: self.block.number + 1,
            timestamp: self.block.timestamp + self.pending_time.max(1),
        }
    }

    fn seal(&mut self, block: BlockEnv) {
        self.block = block;
        self.pending_time = 0;
    }

    fn balance(&self, account: Address) -> U256 {
        self.accounts
            .get(&account)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn account_mut(&mut self, account: Address) -> &mut Account {
        self.accounts.entry(account).or_default()
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    caller: Address,
    address: Address,
    value: U256,
}

impl From<&CallRequest> for Frame {
    fn from(request: &CallRequest) -> Self {
        Self {
            caller: request.from,
            address: request.to,
            value: request.value,
        }
    }
}

struct Executor<'s> {
    state: &'s mut ChainState,
    block: BlockEnv,
    logs: Vec<Log>,
}

impl<'s> Executor<'s> {
    fn new(state: &'s mut ChainState, block: BlockEnv) -> Self {
        Self {
            state,
            block,
            logs: Vec::new(),
        }
    }

    fn call(&mut self, frame: Frame, input: &[u8]) -> ProcessResult {
        let accounts = self.state.accounts.clone();
        let log_count = self.logs.len();
        let result = self.call_unchecked(frame, input);
        if result.is_err() {
            self.state.accounts = accounts;
            self.logs.truncate(log_count);
        }
        result
    }

    fn call_unchecked(&mut self, frame: Frame, input: &[u8]) -> ProcessResult {
        self.move_value(frame.caller, frame.address, frame.value)?;
        let program = self.state.accounts.get(&frame.address).and_then(|a| a.program);
        match program {
            Some(program) => program.process(&mut InvokeContext { executor: self, frame }, input),
            None => Ok(Vec::new()),
        }
    }

    fn create(
        &mut self,
        caller: Address,
        address: Address,
        program: NativeProgram,
        args: &[u8],
    ) -> std::result::Result<(), ExecutionError> {
        self.state.account_mut(address).program = Some(program);
        let frame = Frame {
            caller,
            address,
            value: U256::ZERO,
        };
        program.construct(&mut InvokeContext { executor: self, frame }, args)?;
        Ok(())
    }

    fn move_value(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> std::result::Result<(), ExecutionError> {
        if value.is_zero() {
            return Ok(());
        }
        let balance = self.state.balance(from);
        if balance < value {
            return Err(ExecutionError::InsufficientFunds {
                account: from,
                balance,
                required: value,
            });
        }
        self.state.account_mut(from).balance -= value;
        self.state.account_mut(to).balance += value;
        Ok(())
    }
}

/// What a native program sees of the chain while it runs
pub struct InvokeContext<'e, 's> {
    executor: &'e mut Executor<'s>,
    frame: Frame,
}

impl InvokeContext<'_, '_> {
    /// Address of the running contract
    pub fn address(&self) -> Address {
        self.frame.address
    }

    /// Immediate caller (`msg.sender`)
    pub fn caller(&self) -> Address {
        self.frame.caller
    }

    /// Value attached to the call (`msg.value`)
    pub fn value(&self) -> U256 {
        self.frame.value
    }

    pub fn block(&self) -> BlockEnv {
        self.executor.block
    }

    /// Balance of the running contract, including the attached value
    pub fn balance(&self) -> U256 {
        self.executor.state.balance(self.frame.address)
    }

    pub fn load<T: BorshDeserialize>(&self) -> std::result::Result<T, ExecutionError> {
        let storage = self
            .executor
            .state
            .accounts
            .get(&self.frame.address)
            .map(|a| a.storage.as_slice())
            .unwrap_or_default();
        Ok(T::try_from_slice(storage)?)
    }

    pub fn store<T: BorshSerialize>(&mut self, value: &T) -> std::result::Result<(), ExecutionError> {
        let data = borsh::to_vec(value)?;
        self.executor.state.account_mut(self.frame.address).storage = data;
        Ok(())
    }

    pub fn emit(&mut self, data: LogData) {
        self.executor.logs.push(Log {
            address: self.frame.address,
            data,
        });
    }

    /// Call another contract; its effects roll back if it fails
    pub fn invoke(&mut self, to: Address, input: &[u8]) -> ProcessResult {
        let frame = Frame {
            caller: self.frame.address,
            address: to,
            value: U256::ZERO,
        };
        self.executor.call(frame, input)
    }

    /// Send ether from the running contract
    pub fn transfer(&mut self, to: Address, amount: U256) -> std::result::Result<(), ExecutionError> {
        let frame = Frame {
            caller: self.frame.address,
            address: to,
            value: amount,
        };
        self.executor.call(frame, &[])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Snapshots {
    next_id: u64,
    saved: HashMap<u64, ChainState>,
}

#[derive(Debug)]
pub struct LocalChain {
    chain_id: u64,
    signers: Vec<Address>,
    state: Mutex<ChainState>,
    snapshots: Mutex<Snapshots>,
    logs: broadcast::Sender<Log>,
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::new(HARDHAT_CHAIN_ID)
    }
}

impl LocalChain {
    pub fn new(chain_id: u64) -> Self {
        let (logs, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self {
            chain_id,
            signers: DEV_ACCOUNTS.to_vec(),
            state: Mutex::new(ChainState::genesis()),
            snapshots: Mutex::new(Snapshots::default()),
            logs,
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshots(&self) -> MutexGuard<'_, Snapshots> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn latest_block(&self) -> BlockEnv {
        self.state().block
    }

    /// Advance the clock; the next block lands `seconds` later
    pub fn increase_time(&self, seconds: u64) {
        let mut state = self.state();
        state.pending_time = state.pending_time.saturating_add(seconds);
    }

    /// Mine an empty block
    pub fn mine(&self) -> BlockEnv {
        let mut state = self.state();
        let block = state.next_block();
        state.seal(block);
        block
    }

    /// Save the whole chain state, returning an id for [`LocalChain::revert`]
    pub fn snapshot(&self) -> u64 {
        let state = self.state().clone();
        let mut snapshots = self.snapshots();
        let id = snapshots.next_id;
        snapshots.next_id += 1;
        snapshots.saved.insert(id, state);
        id
    }

    /// Restore a snapshot. Each snapshot can be reverted to once.
    pub fn revert(&self, id: u64) -> bool {
        let Some(saved) = self.snapshots().saved.remove(&id) else {
            return false;
        };
        *self.state() = saved;
        true
    }

    pub fn set_balance(&self, account: Address, balance: U256) {
        self.state().account_mut(account).balance = balance;
    }

    /// Live log subscriptions
    pub fn listener_count(&self) -> usize {
        self.logs.receiver_count()
    }

    fn transact<F>(&self, from: Address, execute: F) -> Result<Receipt>
    where
        F: FnOnce(&mut Executor<'_>, u64) -> std::result::Result<Option<Address>, ExecutionError>,
    {
        let receipt = {
            let mut state = self.state();
            let block = state.next_block();
            let mut working = state.clone();
            let nonce = working.account_mut(from).nonce;

            let mut executor = Executor::new(&mut working, block);
            let contract_address = execute(&mut executor, nonce)?;
            let logs = executor.logs;

            working.account_mut(from).nonce += 1;
            working.seal(block);
            *state = working;

            debug!(block = block.number, %from, logs = logs.len(), "mined transaction");
            Receipt {
                transaction_hash: transaction_hash(self.chain_id, from, nonce),
                block_number: block.number,
                contract_address,
                logs,
            }
        };
        for log in &receipt.logs {
            // no receivers is not an error
            let _ = self.logs.send(log.clone());
        }
        Ok(receipt)
    }
}

fn transaction_hash(chain_id: u64, from: Address, nonce: u64) -> B256 {
    keccak256([&chain_id.to_be_bytes()[..], from.as_slice(), &nonce.to_be_bytes()[..]].concat())
}

#[async_trait]
impl Chain for LocalChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signers(&self) -> &[Address] {
        &self.signers
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.state().block.number)
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        Ok(self.state().balance(account))
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes> {
        let mut working = self.state().clone();
        let block = working.block;
        let mut executor = Executor::new(&mut working, block);
        let output = executor.call(Frame::from(&request), &request.input)?;
        Ok(output.into())
    }

    async fn send(&self, request: CallRequest, _confirmations: u64) -> Result<Receipt> {
        self.transact(request.from, |executor, _| {
            executor.call(Frame::from(&request), &request.input)?;
            Ok(None)
        })
    }

    async fn deploy(
        &self,
        from: Address,
        artifact: &Artifact,
        constructor_args: Bytes,
        _confirmations: u64,
    ) -> Result<Receipt> {
        let program = NativeProgram::from_contract_name(&artifact.contract_name)
            .ok_or_else(|| Error::UnsupportedContract(artifact.contract_name.clone()))?;
        self.transact(from, |executor, nonce| {
            let address = from.create(nonce);
            executor.create(from, address, program, &constructor_args)?;
            Ok(Some(address))
        })
    }

    async fn subscribe(&self, address: Address) -> Result<LogSubscription> {
        Ok(LogSubscription::broadcast(self.logs.subscribe(), address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_accounts_are_funded() {
        let chain = LocalChain::default();
        assert_eq!(chain.signers().len(), 10);
        let balance = chain.balance(DEV_ACCOUNTS[0]).await.unwrap();
        assert_eq!(balance, dev_account_balance());
    }

    #[tokio::test]
    async fn test_plain_transfer_mines_a_block() {
        let chain = LocalChain::default();
        let value = U256::from(1_000u64);
        let request = CallRequest::new(DEV_ACCOUNTS[0], DEV_ACCOUNTS[1], Bytes::new()).with_value(value);

        let receipt = chain.send(request, 1).await.unwrap();
        assert_eq!(receipt.block_number, 1);
        assert_eq!(
            chain.balance(DEV_ACCOUNTS[1]).await.unwrap(),
            dev_account_balance() + value
        );
    }

    #[tokio::test]
    async fn test_overdraft_is_rejected_without_state_change() {
        let chain = LocalChain::default();
        let stranger = Address::repeat_byte(0x42);
        let request = CallRequest::new(stranger, DEV_ACCOUNTS[1], Bytes::new()).with_value(U256::from(1u64));

        let err = chain.send(request, 1).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(chain.block_number().await.unwrap(), 0);
    }

    #[test]
    fn test_time_travel_moves_the_next_block() {
        let chain = LocalChain::default();
        let start = chain.latest_block();

        chain.increase_time(31);
        let block = chain.mine();
        assert_eq!(block.number, start.number + 1);
        assert_eq!(block.timestamp, start.timestamp + 31);

        // blocks without time travel still advance by one second
        assert_eq!(chain.mine().timestamp, start.timestamp + 32);
    }

    #[test]
    fn test_snapshot_restores_state_once() {
        let chain = LocalChain::default();
        let id = chain.snapshot();
        chain.mine();
        chain.set_balance(DEV_ACCOUNTS[0], U256::ZERO);

        assert!(chain.revert(id));
        assert_eq!(chain.latest_block().number, 0);
        assert!(!chain.revert(id));
    }
}
