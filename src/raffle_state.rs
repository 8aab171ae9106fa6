use std::{collections::BTreeMap, convert::TryFrom};

use alloy_primitives::{Address, B256, U256};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::Error;

/// Lifecycle of a raffle round
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum RaffleState {
    /// Raffle is open for entries
    Open,
    /// Upkeep ran, waiting for the coordinator to deliver randomness
    Calculating,
}

impl TryFrom<u8> for RaffleState {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RaffleState::Open),
            1 => Ok(RaffleState::Calculating),
            _ => Err(Error::InvalidRaffleState(val)),
        }
    }
}

impl From<RaffleState> for u8 {
    fn from(state: RaffleState) -> Self {
        match state {
            RaffleState::Open => 0,
            RaffleState::Calculating => 1,
        }
    }
}

/// Raffle contract storage
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RaffleStorage {
    /// Coordinator allowed to deliver randomness
    pub vrf_coordinator: [u8; 20],
    /// Minimum payment in wei to enter
    pub entrance_fee: u128,
    /// Key hash selecting the oracle gas lane
    pub gas_lane: [u8; 32],
    /// Coordinator subscription paying for requests
    pub subscription_id: u64,
    /// Gas limit forwarded with each randomness request
    pub callback_gas_limit: u32,
    /// Seconds a round stays open before upkeep is due
    pub interval: u64,
    /// Entrants of the current round, in entry order
    pub players: Vec<[u8; 20]>,
    /// Winner of the last completed round (zero before the first)
    pub recent_winner: [u8; 20],
    pub state: RaffleState,
    /// Timestamp of deployment or of the last winner pick
    pub last_timestamp: u64,
}

impl RaffleStorage {
    pub fn vrf_coordinator(&self) -> Address {
        Address::from(self.vrf_coordinator)
    }

    pub fn gas_lane(&self) -> B256 {
        B256::from(self.gas_lane)
    }

    pub fn recent_winner(&self) -> Address {
        Address::from(self.recent_winner)
    }

    pub fn player(&self, index: usize) -> Option<Address> {
        self.players.get(index).copied().map(Address::from)
    }

    /// Upkeep is due when the round is open, the interval has strictly
    /// elapsed, and the raffle holds both players and funds.
    pub fn upkeep_needed(&self, now: u64, balance: U256) -> bool {
        let is_open = self.state == RaffleState::Open;
        let time_passed = now.saturating_sub(self.last_timestamp) > self.interval;
        let has_players = !self.players.is_empty();
        let has_balance = balance > U256::ZERO;
        is_open && time_passed && has_players && has_balance
    }
}

/// Subscription record of the coordinator mock
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
    pub owner: [u8; 20],
    /// LINK balance in juels
    pub balance: u128,
    pub request_count: u64,
    pub consumers: Vec<[u8; 20]>,
}

/// Randomness request waiting for fulfillment
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// VRF coordinator mock storage
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStorage {
    /// Flat LINK premium charged per fulfillment
    pub base_fee: u128,
    /// LINK price per gas unit, recorded but unused without gas metering
    pub gas_price_link: u128,
    /// Last subscription id handed out
    pub current_subscription_id: u64,
    /// Id the next request receives
    pub next_request_id: u64,
    pub next_pre_seed: u64,
    pub subscriptions: BTreeMap<u64, Subscription>,
    pub requests: BTreeMap<u64, PendingRequest>,
}
