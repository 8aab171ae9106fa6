// Raffle contract running natively on the in-process network
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolInterface, SolValue};
use tracing::{debug, info};

use crate::{
    bindings::{
        IRaffle::{self, IRaffleCalls},
        VRFCoordinatorV2Mock,
    },
    local_chain::{ExecutionError, InvokeContext, ProcessResult},
    raffle_error::{RaffleError, Revert, PANIC_ARITHMETIC, PANIC_ARRAY_OUT_OF_BOUNDS},
    raffle_instruction,
    raffle_state::{RaffleState, RaffleStorage},
    utils,
};

pub const CONTRACT_NAME: &str = "Raffle";

/// Confirmations the coordinator waits before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;
/// Random words requested per round
pub const NUM_WORDS: u32 = 1;

pub struct Processor;

impl Processor {
    /// Run the constructor
    ///
    /// Arguments: `(vrfCoordinatorV2, entranceFee, gasLane, subscriptionId,
    /// callbackGasLimit, interval)`
    pub fn construct(ctx: &mut InvokeContext<'_, '_>, args: &[u8]) -> ProcessResult {
        let (vrf_coordinator, entrance_fee, gas_lane, subscription_id, callback_gas_limit, interval) =
            <(Address, U256, B256, u64, u32, U256)>::abi_decode_params(args)?;

        let raffle = RaffleStorage {
            vrf_coordinator: vrf_coordinator.into_array(),
            entrance_fee: to_u128(entrance_fee)?,
            gas_lane: gas_lane.0,
            subscription_id,
            callback_gas_limit,
            interval: u64::try_from(interval).map_err(|_| Revert::panic(PANIC_ARITHMETIC))?,
            players: Vec::new(),
            recent_winner: [0; 20],
            state: RaffleState::Open,
            last_timestamp: ctx.block().timestamp,
        };
        ctx.store(&raffle)?;
        info!(address = %ctx.address(), %vrf_coordinator, subscription_id, "Raffle constructed");
        Ok(Vec::new())
    }

    pub fn process(ctx: &mut InvokeContext<'_, '_>, input: &[u8]) -> ProcessResult {
        let instruction = IRaffleCalls::abi_decode(input)?;

        // only enterRaffle is payable
        if !ctx.value().is_zero() && !matches!(instruction, IRaffleCalls::enterRaffle(_)) {
            return Err(Revert::default().into());
        }

        match instruction {
            IRaffleCalls::enterRaffle(_) => {
                debug!("Instruction: Enter Raffle");
                Self::process_enter_raffle(ctx)
            }
            IRaffleCalls::checkUpkeep(_) => {
                debug!("Instruction: Check Upkeep");
                Self::process_check_upkeep(ctx)
            }
            IRaffleCalls::performUpkeep(_) => {
                debug!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(ctx)
            }
            IRaffleCalls::rawFulfillRandomWords(call) => {
                debug!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(ctx, call.requestId, &call.randomWords)
            }
            IRaffleCalls::getRalleState(_) => {
                let raffle = Self::load(ctx)?;
                Ok(U256::from(u8::from(raffle.state)).abi_encode())
            }
            IRaffleCalls::getNumWords(_) => Ok(U256::from(NUM_WORDS).abi_encode()),
            IRaffleCalls::getRequestConfirmations(_) => {
                Ok(U256::from(REQUEST_CONFIRMATIONS).abi_encode())
            }
            IRaffleCalls::getRecentWinner(_) => {
                let raffle = Self::load(ctx)?;
                Ok(raffle.recent_winner().abi_encode())
            }
            IRaffleCalls::getPlayer(call) => {
                let raffle = Self::load(ctx)?;
                let player = usize::try_from(call.index)
                    .ok()
                    .and_then(|index| raffle.player(index))
                    .ok_or_else(|| Revert::panic(PANIC_ARRAY_OUT_OF_BOUNDS))?;
                Ok(player.abi_encode())
            }
            IRaffleCalls::getLatestTimestamp(_) => {
                let raffle = Self::load(ctx)?;
                Ok(U256::from(raffle.last_timestamp).abi_encode())
            }
            IRaffleCalls::getInterval(_) => {
                let raffle = Self::load(ctx)?;
                Ok(U256::from(raffle.interval).abi_encode())
            }
            IRaffleCalls::getEntranceFee(_) => {
                let raffle = Self::load(ctx)?;
                Ok(U256::from(raffle.entrance_fee).abi_encode())
            }
            IRaffleCalls::getNumberOfPlayers(_) => {
                let raffle = Self::load(ctx)?;
                Ok(U256::from(raffle.players.len()).abi_encode())
            }
        }
    }

    fn load(ctx: &InvokeContext<'_, '_>) -> Result<RaffleStorage, ExecutionError> {
        ctx.load()
    }

    /// Record the caller as a player of the open round
    fn process_enter_raffle(ctx: &mut InvokeContext<'_, '_>) -> ProcessResult {
        let mut raffle = Self::load(ctx)?;

        if ctx.value() < U256::from(raffle.entrance_fee) {
            return Err(RaffleError::NotEnoughEthEntered.into());
        }
        if raffle.state != RaffleState::Open {
            return Err(RaffleError::NotOpen.into());
        }

        let player = ctx.caller();
        raffle.players.push(player.into_array());
        ctx.store(&raffle)?;

        ctx.emit(IRaffle::RaffleEnter { player }.encode_log_data());
        info!(%player, players = raffle.players.len(), "Player entered raffle");
        Ok(Vec::new())
    }

    fn process_check_upkeep(ctx: &mut InvokeContext<'_, '_>) -> ProcessResult {
        let raffle = Self::load(ctx)?;
        let upkeep_needed = raffle.upkeep_needed(ctx.block().timestamp, ctx.balance());
        Ok((upkeep_needed, Bytes::new()).abi_encode_params())
    }

    /// Close the round and ask the coordinator for a random word
    fn process_perform_upkeep(ctx: &mut InvokeContext<'_, '_>) -> ProcessResult {
        let mut raffle = Self::load(ctx)?;
        let balance = ctx.balance();

        if !raffle.upkeep_needed(ctx.block().timestamp, balance) {
            return Err(RaffleError::UpkeepNotNeeded {
                current_balance: balance,
                num_players: U256::from(raffle.players.len()),
                raffle_state: U256::from(u8::from(raffle.state)),
            }
            .into());
        }

        raffle.state = RaffleState::Calculating;
        ctx.store(&raffle)?;

        let request = raffle_instruction::request_random_words_input(
            raffle.gas_lane(),
            raffle.subscription_id,
            REQUEST_CONFIRMATIONS,
            raffle.callback_gas_limit,
            NUM_WORDS,
        );
        let output = ctx.invoke(raffle.vrf_coordinator(), &request)?;
        let request_id = VRFCoordinatorV2Mock::requestRandomWordsCall::abi_decode_returns(&output)?;

        ctx.emit(IRaffle::RequestedRaffleWinner { requestId: request_id }.encode_log_data());
        info!(%request_id, "Requested raffle winner");
        Ok(Vec::new())
    }

    /// Pick the winner from the delivered word and pay out the whole balance
    fn process_fulfill_random_words(
        ctx: &mut InvokeContext<'_, '_>,
        request_id: U256,
        random_words: &[U256],
    ) -> ProcessResult {
        let mut raffle = Self::load(ctx)?;

        let coordinator = raffle.vrf_coordinator();
        if ctx.caller() != coordinator {
            return Err(RaffleError::OnlyCoordinatorCanFulfill {
                have: ctx.caller(),
                want: coordinator,
            }
            .into());
        }

        let word = random_words
            .first()
            .copied()
            .ok_or_else(|| Revert::panic(PANIC_ARRAY_OUT_OF_BOUNDS))?;
        let index = utils::winner_index(word, raffle.players.len())?;
        let winner = raffle
            .player(index)
            .ok_or_else(|| Revert::panic(PANIC_ARRAY_OUT_OF_BOUNDS))?;

        raffle.recent_winner = winner.into_array();
        raffle.state = RaffleState::Open;
        raffle.players.clear();
        raffle.last_timestamp = ctx.block().timestamp;
        ctx.store(&raffle)?;

        let prize = ctx.balance();
        ctx.transfer(winner, prize)
            .map_err(|_| ExecutionError::from(RaffleError::TransferFailed))?;

        ctx.emit(IRaffle::WinnerPicked { winner }.encode_log_data());
        info!(%request_id, %winner, %prize, "Winner picked");
        Ok(Vec::new())
    }
}

fn to_u128(value: U256) -> Result<u128, ExecutionError> {
    u128::try_from(value).map_err(|_| Revert::panic(PANIC_ARITHMETIC).into())
}
