// Raffle deployment tooling
// Deploys the Raffle lottery and its randomness mock, publishes front-end
// artifacts and drives the contract from tests on local and live networks.

// Core modules
pub mod config;
pub mod error;
pub mod utils;

// Chain access
pub mod artifacts;
pub mod bindings;
pub mod chain;
pub mod live_chain;
pub mod local_chain;

// Contract modules
pub mod contract;
pub mod raffle_error;
pub mod raffle_instruction;
pub mod raffle_processor;
pub mod raffle_state;

// VRF coordinator mock for local randomness
pub mod vrf;

// Deploy scripts and test harness
pub mod deploy;
pub mod deployments;
pub mod harness;

pub use chain::{CallRequest, Chain, LogSubscription, Receipt};
pub use config::Config;
pub use contract::{ContractEvent, CoordinatorEvent, EventSubscription, Raffle, RaffleEvent, VrfCoordinatorMock};
pub use deploy::DeployEnvironment;
pub use error::{Error, Result};
pub use harness::{EventWait, WaitState};
pub use local_chain::LocalChain;
pub use live_chain::LiveChain;
pub use raffle_error::{CoordinatorError, RaffleError, Revert};
pub use raffle_state::RaffleState;
