//! Typed clients for the deployed Raffle and VRF coordinator mock.

use std::{fmt, marker::PhantomData, sync::Arc, time::Duration};

use alloy_primitives::{Address, Log, U256};
use alloy_sol_types::{SolCall, SolEventInterface};

use crate::{
    bindings::{
        IRaffle::{self, IRaffleEvents},
        VRFCoordinatorV2Mock::{self, VRFCoordinatorV2MockEvents},
    },
    chain::{Chain, LogSubscription, Receipt},
    error::{Error, Result},
    harness::EventWait,
    raffle_instruction,
    raffle_state::RaffleState,
};

/// Notifications a contract emits, decoded from raw logs
pub trait ContractEvent: Sized + Send + fmt::Debug + 'static {
    /// Every event name the contract declares
    const NAMES: &'static [&'static str];

    fn decode(log: &Log) -> Option<Self>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleEnter { player: Address },
    RequestedRaffleWinner { request_id: U256 },
    WinnerPicked { winner: Address },
}

impl RaffleEvent {
    pub const RAFFLE_ENTER: &'static str = "RaffleEnter";
    pub const REQUESTED_RAFFLE_WINNER: &'static str = "RequestedRaffleWinner";
    pub const WINNER_PICKED: &'static str = "WinnerPicked";
}

impl ContractEvent for RaffleEvent {
    const NAMES: &'static [&'static str] = &[
        Self::RAFFLE_ENTER,
        Self::REQUESTED_RAFFLE_WINNER,
        Self::WINNER_PICKED,
    ];

    fn decode(log: &Log) -> Option<Self> {
        let event = match IRaffleEvents::decode_raw_log(log.topics(), &log.data.data).ok()? {
            IRaffleEvents::RaffleEnter(e) => RaffleEvent::RaffleEnter { player: e.player },
            IRaffleEvents::RequestedRaffleWinner(e) => RaffleEvent::RequestedRaffleWinner {
                request_id: e.requestId,
            },
            IRaffleEvents::WinnerPicked(e) => RaffleEvent::WinnerPicked { winner: e.winner },
        };
        Some(event)
    }

    fn name(&self) -> &'static str {
        match self {
            RaffleEvent::RaffleEnter { .. } => Self::RAFFLE_ENTER,
            RaffleEvent::RequestedRaffleWinner { .. } => Self::REQUESTED_RAFFLE_WINNER,
            RaffleEvent::WinnerPicked { .. } => Self::WINNER_PICKED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    SubscriptionCreated { sub_id: u64, owner: Address },
    SubscriptionFunded { sub_id: u64, old_balance: U256, new_balance: U256 },
    RandomWordsRequested { request_id: U256, sub_id: u64, sender: Address },
    RandomWordsFulfilled { request_id: U256, payment: U256, success: bool },
    ConsumerAdded { sub_id: u64, consumer: Address },
}

impl ContractEvent for CoordinatorEvent {
    const NAMES: &'static [&'static str] = &[
        "SubscriptionCreated",
        "SubscriptionFunded",
        "RandomWordsRequested",
        "RandomWordsFulfilled",
        "ConsumerAdded",
    ];

    fn decode(log: &Log) -> Option<Self> {
        let event =
            match VRFCoordinatorV2MockEvents::decode_raw_log(log.topics(), &log.data.data).ok()? {
                VRFCoordinatorV2MockEvents::SubscriptionCreated(e) => {
                    CoordinatorEvent::SubscriptionCreated {
                        sub_id: e.subId,
                        owner: e.owner,
                    }
                }
                VRFCoordinatorV2MockEvents::SubscriptionFunded(e) => {
                    CoordinatorEvent::SubscriptionFunded {
                        sub_id: e.subId,
                        old_balance: e.oldBalance,
                        new_balance: e.newBalance,
                    }
                }
                VRFCoordinatorV2MockEvents::RandomWordsRequested(e) => {
                    CoordinatorEvent::RandomWordsRequested {
                        request_id: e.requestId,
                        sub_id: e.subId,
                        sender: e.sender,
                    }
                }
                VRFCoordinatorV2MockEvents::RandomWordsFulfilled(e) => {
                    CoordinatorEvent::RandomWordsFulfilled {
                        request_id: e.requestId,
                        payment: U256::from(e.payment),
                        success: e.success,
                    }
                }
                VRFCoordinatorV2MockEvents::ConsumerAdded(e) => CoordinatorEvent::ConsumerAdded {
                    sub_id: e.subId,
                    consumer: e.consumer,
                },
            };
        Some(event)
    }

    fn name(&self) -> &'static str {
        match self {
            CoordinatorEvent::SubscriptionCreated { .. } => Self::NAMES[0],
            CoordinatorEvent::SubscriptionFunded { .. } => Self::NAMES[1],
            CoordinatorEvent::RandomWordsRequested { .. } => Self::NAMES[2],
            CoordinatorEvent::RandomWordsFulfilled { .. } => Self::NAMES[3],
            CoordinatorEvent::ConsumerAdded { .. } => Self::NAMES[4],
        }
    }
}

/// Decoded notifications of one contract
#[derive(Debug)]
pub struct EventSubscription<E> {
    logs: LogSubscription,
    _event: PhantomData<fn() -> E>,
}

impl<E: ContractEvent> EventSubscription<E> {
    pub fn new(logs: LogSubscription) -> Self {
        Self {
            logs,
            _event: PhantomData,
        }
    }

    /// Next notification of the contract, skipping logs that do not decode
    pub async fn next(&mut self) -> Option<E> {
        loop {
            let log = self.logs.recv().await?;
            if let Some(event) = E::decode(&log) {
                return Some(event);
            }
        }
    }

    /// Next notification called `name`
    pub async fn next_named(&mut self, name: &str) -> Option<E> {
        loop {
            let event = self.next().await?;
            if event.name() == name {
                return Some(event);
            }
        }
    }

    pub fn cancel(&mut self) {
        self.logs.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.logs.is_active()
    }
}

async fn subscribe<E: ContractEvent>(chain: &dyn Chain, address: Address) -> Result<EventSubscription<E>> {
    Ok(EventSubscription::new(chain.subscribe(address).await?))
}

async fn one_shot<E: ContractEvent>(
    chain: &dyn Chain,
    address: Address,
    event: &str,
    timeout: Duration,
) -> Result<EventWait<E>> {
    let name = E::NAMES
        .iter()
        .copied()
        .find(|n| *n == event)
        .ok_or_else(|| Error::UnknownEvent(event.to_string()))?;
    let subscription = subscribe(chain, address).await?;
    Ok(EventWait::new(subscription, name, timeout))
}

/// Raffle bound to an address and a signer
#[derive(Debug, Clone)]
pub struct Raffle {
    chain: Arc<dyn Chain>,
    address: Address,
    signer: Address,
    confirmations: u64,
}

impl Raffle {
    pub fn new(chain: Arc<dyn Chain>, address: Address, signer: Address) -> Self {
        Self {
            chain,
            address,
            signer,
            confirmations: 1,
        }
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Same contract, transactions signed by `signer`
    pub fn connect(&self, signer: Address) -> Self {
        Self {
            signer,
            ..self.clone()
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    async fn query<C: SolCall + Send + Sync>(&self, call: C) -> Result<C::Return> {
        let request = raffle_instruction::query(self.address, self.signer, &call);
        let output = self.chain.call(request).await?;
        Ok(C::abi_decode_returns(&output)?)
    }

    pub async fn entrance_fee(&self) -> Result<U256> {
        self.query(IRaffle::getEntranceFeeCall {}).await
    }

    pub async fn interval(&self) -> Result<U256> {
        self.query(IRaffle::getIntervalCall {}).await
    }

    pub async fn player(&self, index: u64) -> Result<Address> {
        let request = raffle_instruction::get_player(self.address, self.signer, U256::from(index));
        let output = self.chain.call(request).await?;
        Ok(IRaffle::getPlayerCall::abi_decode_returns(&output)?)
    }

    pub async fn latest_timestamp(&self) -> Result<U256> {
        self.query(IRaffle::getLatestTimestampCall {}).await
    }

    pub async fn raffle_state(&self) -> Result<RaffleState> {
        let state = self.query(IRaffle::getRalleStateCall {}).await?;
        RaffleState::try_from(state)
    }

    pub async fn recent_winner(&self) -> Result<Address> {
        self.query(IRaffle::getRecentWinnerCall {}).await
    }

    pub async fn number_of_players(&self) -> Result<U256> {
        self.query(IRaffle::getNumberOfPlayersCall {}).await
    }

    pub async fn num_words(&self) -> Result<U256> {
        self.query(IRaffle::getNumWordsCall {}).await
    }

    pub async fn request_confirmations(&self) -> Result<U256> {
        self.query(IRaffle::getRequestConfirmationsCall {}).await
    }

    /// Simulate `checkUpkeep("")` without sending a transaction
    pub async fn check_upkeep(&self) -> Result<bool> {
        let request = raffle_instruction::check_upkeep(self.address, self.signer);
        let output = self.chain.call(request).await?;
        Ok(IRaffle::checkUpkeepCall::abi_decode_returns(&output)?.upkeepNeeded)
    }

    pub async fn enter_raffle(&self, value: U256) -> Result<Receipt> {
        let request = raffle_instruction::enter_raffle(self.address, self.signer, value);
        self.chain.send(request, self.confirmations).await
    }

    pub async fn perform_upkeep(&self) -> Result<Receipt> {
        let request = raffle_instruction::perform_upkeep(self.address, self.signer);
        self.chain.send(request, self.confirmations).await
    }

    /// Register a one-shot wait for `event`; the listener is live on return
    pub async fn once(&self, event: &str, timeout: Duration) -> Result<EventWait<RaffleEvent>> {
        one_shot(self.chain.as_ref(), self.address, event, timeout).await
    }
}

/// Subscription as reported by `getSubscription`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub balance: U256,
    pub request_count: u64,
    pub owner: Address,
    pub consumers: Vec<Address>,
}

#[derive(Debug, Clone)]
pub struct VrfCoordinatorMock {
    chain: Arc<dyn Chain>,
    address: Address,
    signer: Address,
    confirmations: u64,
}

impl VrfCoordinatorMock {
    pub fn new(chain: Arc<dyn Chain>, address: Address, signer: Address) -> Self {
        Self {
            chain,
            address,
            signer,
            confirmations: 1,
        }
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn connect(&self, signer: Address) -> Self {
        Self {
            signer,
            ..self.clone()
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Create a subscription owned by the signer, returning its id
    pub async fn create_subscription(&self) -> Result<(Receipt, u64)> {
        let request = raffle_instruction::create_subscription(self.address, self.signer);
        let receipt = self.chain.send(request, self.confirmations).await?;
        let sub_id = receipt
            .events::<CoordinatorEvent>()
            .into_iter()
            .find_map(|event| match event {
                CoordinatorEvent::SubscriptionCreated { sub_id, .. } => Some(sub_id),
                _ => None,
            })
            .ok_or_else(|| Error::UnknownEvent("SubscriptionCreated".to_string()))?;
        Ok((receipt, sub_id))
    }

    pub async fn fund_subscription(&self, sub_id: u64, amount: U256) -> Result<Receipt> {
        let request = raffle_instruction::fund_subscription(self.address, self.signer, sub_id, amount);
        self.chain.send(request, self.confirmations).await
    }

    /// Allow `consumer` to request randomness from `sub_id`
    pub async fn add_consumer(&self, sub_id: u64, consumer: Address) -> Result<Receipt> {
        let request = raffle_instruction::add_consumer(self.address, self.signer, sub_id, consumer);
        self.chain.send(request, self.confirmations).await
    }

    pub async fn subscription(&self, sub_id: u64) -> Result<SubscriptionInfo> {
        let request = raffle_instruction::get_subscription(self.address, self.signer, sub_id);
        let output = self.chain.call(request).await?;
        let ret = VRFCoordinatorV2Mock::getSubscriptionCall::abi_decode_returns(&output)?;
        Ok(SubscriptionInfo {
            balance: U256::from(ret.balance),
            request_count: ret.reqCount,
            owner: ret.owner,
            consumers: ret.consumers,
        })
    }

    /// Deliver random words for `request_id` to `consumer`
    pub async fn fulfill_random_words(&self, request_id: U256, consumer: Address) -> Result<Receipt> {
        let request =
            raffle_instruction::fulfill_random_words(self.address, self.signer, request_id, consumer);
        self.chain.send(request, self.confirmations).await
    }
}
