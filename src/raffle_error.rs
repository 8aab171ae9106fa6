// Raffle contract failures and revert data decoding
use std::fmt;

use alloy_primitives::{hex, Address, Bytes, U256};
use alloy_sol_types::{Panic, Revert as RevertReason, SolError, SolInterface};
use thiserror::Error;

use crate::bindings::{
    IRaffle::{self, IRaffleErrors},
    VRFCoordinatorV2Mock::{self, VRFCoordinatorV2MockErrors},
};

/// Reason string the coordinator mock reverts with for unknown request ids
pub const NONEXISTENT_REQUEST: &str = "nonexistent request";

/// Panic code for arithmetic overflow
pub const PANIC_ARITHMETIC: u64 = 0x11;
/// Panic code for division or modulo by zero
pub const PANIC_DIVISION_BY_ZERO: u64 = 0x12;
/// Panic code for out-of-bounds array access
pub const PANIC_ARRAY_OUT_OF_BOUNDS: u64 = 0x32;

/// Errors that may be returned by the Raffle contract
///
/// `Display` yields the on-chain error name so assertions can compare names.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Entry paid less than the entrance fee
    #[error("Raffle__NotEnoughETHEntered")]
    NotEnoughEthEntered,

    /// Paying the prize to the winner failed
    #[error("Raffle__TransferFailed")]
    TransferFailed,

    /// Raffle is calculating a winner and takes no entries
    #[error("Raffle__NotOpen")]
    NotOpen,

    /// Upkeep performed while its conditions do not hold
    #[error("Raffle__UpkeepNotNeeded")]
    UpkeepNotNeeded {
        current_balance: U256,
        num_players: U256,
        raffle_state: U256,
    },

    /// Randomness delivered by an account other than the coordinator
    #[error("OnlyCoordinatorCanFulfill")]
    OnlyCoordinatorCanFulfill { have: Address, want: Address },
}

impl RaffleError {
    /// Decode a Raffle custom error from revert data
    pub fn decode(data: &[u8]) -> Option<Self> {
        let error = match IRaffleErrors::abi_decode(data).ok()? {
            IRaffleErrors::Raffle__NotEnoughETHEntered(_) => Self::NotEnoughEthEntered,
            IRaffleErrors::Raffle__TransferFailed(_) => Self::TransferFailed,
            IRaffleErrors::Raffle__NotOpen(_) => Self::NotOpen,
            IRaffleErrors::Raffle__UpkeepNotNeeded(e) => Self::UpkeepNotNeeded {
                current_balance: e.currentBalance,
                num_players: e.numPlayers,
                raffle_state: e.raffleState,
            },
            IRaffleErrors::OnlyCoordinatorCanFulfill(e) => Self::OnlyCoordinatorCanFulfill {
                have: e.have,
                want: e.want,
            },
        };
        Some(error)
    }
}

impl From<RaffleError> for Revert {
    fn from(e: RaffleError) -> Self {
        let data = match e {
            RaffleError::NotEnoughEthEntered => IRaffle::Raffle__NotEnoughETHEntered {}.abi_encode(),
            RaffleError::TransferFailed => IRaffle::Raffle__TransferFailed {}.abi_encode(),
            RaffleError::NotOpen => IRaffle::Raffle__NotOpen {}.abi_encode(),
            RaffleError::UpkeepNotNeeded {
                current_balance,
                num_players,
                raffle_state,
            } => IRaffle::Raffle__UpkeepNotNeeded {
                currentBalance: current_balance,
                numPlayers: num_players,
                raffleState: raffle_state,
            }
            .abi_encode(),
            RaffleError::OnlyCoordinatorCanFulfill { have, want } => {
                IRaffle::OnlyCoordinatorCanFulfill { have, want }.abi_encode()
            }
        };
        Revert::new(data)
    }
}

/// Errors that may be returned by the VRF coordinator mock
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// No pending request carries the given id
    #[error("nonexistent request")]
    NonexistentRequest,

    /// Subscription id was never created
    #[error("InvalidSubscription")]
    InvalidSubscription,

    /// Subscription cannot pay for the fulfillment
    #[error("InsufficientBalance")]
    InsufficientBalance,

    #[error("MustBeSubOwner")]
    MustBeSubOwner { owner: Address },
}

impl CoordinatorError {
    pub fn decode(data: &[u8]) -> Option<Self> {
        if let Ok(reason) = RevertReason::abi_decode(data) {
            return (reason.reason == NONEXISTENT_REQUEST).then_some(Self::NonexistentRequest);
        }
        let error = match VRFCoordinatorV2MockErrors::abi_decode(data).ok()? {
            VRFCoordinatorV2MockErrors::InvalidSubscription(_) => Self::InvalidSubscription,
            VRFCoordinatorV2MockErrors::InsufficientBalance(_) => Self::InsufficientBalance,
            VRFCoordinatorV2MockErrors::MustBeSubOwner(e) => Self::MustBeSubOwner { owner: e.owner },
        };
        Some(error)
    }
}

impl From<CoordinatorError> for Revert {
    fn from(e: CoordinatorError) -> Self {
        let data = match e {
            CoordinatorError::NonexistentRequest => RevertReason {
                reason: NONEXISTENT_REQUEST.to_string(),
            }
            .abi_encode(),
            CoordinatorError::InvalidSubscription => {
                VRFCoordinatorV2Mock::InvalidSubscription {}.abi_encode()
            }
            CoordinatorError::InsufficientBalance => {
                VRFCoordinatorV2Mock::InsufficientBalance {}.abi_encode()
            }
            CoordinatorError::MustBeSubOwner { owner } => {
                VRFCoordinatorV2Mock::MustBeSubOwner { owner }.abi_encode()
            }
        };
        Revert::new(data)
    }
}

/// Raw data of a reverted call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Revert {
    data: Bytes,
}

impl Revert {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Revert carrying a Solidity `Panic(uint256)` code
    pub fn panic(code: u64) -> Self {
        Self::new(Panic { code: U256::from(code) }.abi_encode())
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn raffle_error(&self) -> Option<RaffleError> {
        RaffleError::decode(&self.data)
    }

    pub fn coordinator_error(&self) -> Option<CoordinatorError> {
        CoordinatorError::decode(&self.data)
    }

    /// Decoded failure name or reason string, `None` for empty or unknown data
    pub fn reason(&self) -> Option<String> {
        if let Some(e) = self.raffle_error() {
            return Some(e.to_string());
        }
        if let Some(e) = self.coordinator_error() {
            return Some(e.to_string());
        }
        if let Ok(revert) = RevertReason::abi_decode(&self.data) {
            return Some(revert.reason);
        }
        Panic::abi_decode(&self.data)
            .ok()
            .map(|panic| format!("panic code 0x{:x}", panic.code))
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => f.write_str(&reason),
            None if self.data.is_empty() => f.write_str("reverted without a reason"),
            None => write!(f, "reverted with data 0x{}", hex::encode(&self.data)),
        }
    }
}
