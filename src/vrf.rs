// VRF coordinator mock running natively on the in-process network
//
// Subscriptions pay a flat base fee per fulfillment. Randomness is derived
// from the request id, and fulfillment is triggered by hand through
// `fulfillRandomWords(requestId, consumer)`.
use alloy_primitives::{aliases::U96, Address, U256};
use alloy_sol_types::{SolEvent, SolInterface, SolValue};
use tracing::{debug, info, warn};

use crate::{
    bindings::VRFCoordinatorV2Mock::{self, VRFCoordinatorV2MockCalls},
    local_chain::{ExecutionError, InvokeContext, ProcessResult},
    raffle_error::{CoordinatorError, Revert, PANIC_ARITHMETIC},
    raffle_instruction,
    raffle_state::{CoordinatorStorage, PendingRequest, Subscription},
    utils,
};

pub const CONTRACT_NAME: &str = "VRFCoordinatorV2Mock";

/// First pre-seed handed out with a request
const INITIAL_PRE_SEED: u64 = 100;

pub struct CoordinatorProcessor;

impl CoordinatorProcessor {
    /// Arguments: `(baseFee, gasPriceLink)`
    pub fn construct(ctx: &mut InvokeContext<'_, '_>, args: &[u8]) -> ProcessResult {
        let (base_fee, gas_price_link) = <(U256, U256)>::abi_decode_params(args)?;
        let coordinator = CoordinatorStorage {
            base_fee: to_u128(base_fee)?,
            gas_price_link: to_u128(gas_price_link)?,
            current_subscription_id: 0,
            next_request_id: 1,
            next_pre_seed: INITIAL_PRE_SEED,
            ..CoordinatorStorage::default()
        };
        ctx.store(&coordinator)?;
        info!(address = %ctx.address(), %base_fee, %gas_price_link, "VRF coordinator mock constructed");
        Ok(Vec::new())
    }

    pub fn process(ctx: &mut InvokeContext<'_, '_>, input: &[u8]) -> ProcessResult {
        if !ctx.value().is_zero() {
            return Err(Revert::default().into());
        }

        match VRFCoordinatorV2MockCalls::abi_decode(input)? {
            VRFCoordinatorV2MockCalls::createSubscription(_) => {
                debug!("Instruction: Create Subscription");
                Self::process_create_subscription(ctx)
            }
            VRFCoordinatorV2MockCalls::fundSubscription(call) => {
                debug!("Instruction: Fund Subscription");
                Self::process_fund_subscription(ctx, call.subId, call.amount.to::<u128>())
            }
            VRFCoordinatorV2MockCalls::addConsumer(call) => {
                debug!("Instruction: Add Consumer");
                Self::process_add_consumer(ctx, call.subId, call.consumer)
            }
            VRFCoordinatorV2MockCalls::getSubscription(call) => {
                let coordinator: CoordinatorStorage = ctx.load()?;
                let subscription = coordinator
                    .subscriptions
                    .get(&call.subId)
                    .ok_or(CoordinatorError::InvalidSubscription)?;
                let consumers: Vec<Address> =
                    subscription.consumers.iter().copied().map(Address::from).collect();
                Ok((
                    U256::from(subscription.balance),
                    subscription.request_count,
                    Address::from(subscription.owner),
                    consumers,
                )
                    .abi_encode_params())
            }
            VRFCoordinatorV2MockCalls::requestRandomWords(call) => {
                debug!("Instruction: Request Random Words");
                Self::process_request_random_words(ctx, call)
            }
            VRFCoordinatorV2MockCalls::fulfillRandomWords(call) => {
                debug!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(ctx, call.requestId, call.consumer)
            }
        }
    }

    fn process_create_subscription(ctx: &mut InvokeContext<'_, '_>) -> ProcessResult {
        let mut coordinator: CoordinatorStorage = ctx.load()?;
        coordinator.current_subscription_id += 1;
        let sub_id = coordinator.current_subscription_id;
        let owner = ctx.caller();
        coordinator.subscriptions.insert(
            sub_id,
            Subscription {
                owner: owner.into_array(),
                ..Subscription::default()
            },
        );
        ctx.store(&coordinator)?;

        ctx.emit(VRFCoordinatorV2Mock::SubscriptionCreated { subId: sub_id, owner }.encode_log_data());
        info!(sub_id, %owner, "Subscription created");
        Ok(sub_id.abi_encode())
    }

    fn process_fund_subscription(
        ctx: &mut InvokeContext<'_, '_>,
        sub_id: u64,
        amount: u128,
    ) -> ProcessResult {
        let mut coordinator: CoordinatorStorage = ctx.load()?;
        let subscription = coordinator
            .subscriptions
            .get_mut(&sub_id)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        let old_balance = subscription.balance;
        subscription.balance = old_balance.saturating_add(amount);
        let new_balance = subscription.balance;
        ctx.store(&coordinator)?;

        ctx.emit(
            VRFCoordinatorV2Mock::SubscriptionFunded {
                subId: sub_id,
                oldBalance: U256::from(old_balance),
                newBalance: U256::from(new_balance),
            }
            .encode_log_data(),
        );
        info!(sub_id, old_balance, new_balance, "Subscription funded");
        Ok(Vec::new())
    }

    /// Only the subscription owner may add consumers; adding twice is a no-op
    fn process_add_consumer(
        ctx: &mut InvokeContext<'_, '_>,
        sub_id: u64,
        consumer: Address,
    ) -> ProcessResult {
        let mut coordinator: CoordinatorStorage = ctx.load()?;
        let subscription = coordinator
            .subscriptions
            .get_mut(&sub_id)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        let owner = Address::from(subscription.owner);
        if ctx.caller() != owner {
            return Err(CoordinatorError::MustBeSubOwner { owner }.into());
        }
        let consumer_bytes = consumer.into_array();
        if subscription.consumers.contains(&consumer_bytes) {
            return Ok(Vec::new());
        }
        subscription.consumers.push(consumer_bytes);
        ctx.store(&coordinator)?;

        ctx.emit(VRFCoordinatorV2Mock::ConsumerAdded { subId: sub_id, consumer }.encode_log_data());
        info!(sub_id, %consumer, "Consumer added");
        Ok(Vec::new())
    }

    fn process_request_random_words(
        ctx: &mut InvokeContext<'_, '_>,
        call: VRFCoordinatorV2Mock::requestRandomWordsCall,
    ) -> ProcessResult {
        let mut coordinator: CoordinatorStorage = ctx.load()?;
        let subscription = coordinator
            .subscriptions
            .get_mut(&call.subId)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        subscription.request_count += 1;

        let request_id = coordinator.next_request_id;
        let pre_seed = coordinator.next_pre_seed;
        coordinator.next_request_id += 1;
        coordinator.next_pre_seed += 1;
        coordinator.requests.insert(
            request_id,
            PendingRequest {
                subscription_id: call.subId,
                callback_gas_limit: call.callbackGasLimit,
                num_words: call.numWords,
            },
        );
        ctx.store(&coordinator)?;

        ctx.emit(
            VRFCoordinatorV2Mock::RandomWordsRequested {
                keyHash: call.keyHash,
                requestId: U256::from(request_id),
                preSeed: U256::from(pre_seed),
                subId: call.subId,
                minimumRequestConfirmations: call.minimumRequestConfirmations,
                callbackGasLimit: call.callbackGasLimit,
                numWords: call.numWords,
                sender: ctx.caller(),
            }
            .encode_log_data(),
        );
        info!(request_id, sub_id = call.subId, sender = %ctx.caller(), "Random words requested");
        Ok(U256::from(request_id).abi_encode())
    }

    /// Deliver words to `consumer` and charge the subscription. A failing
    /// consumer does not revert the fulfillment; it is reported in the event.
    fn process_fulfill_random_words(
        ctx: &mut InvokeContext<'_, '_>,
        request_id: U256,
        consumer: Address,
    ) -> ProcessResult {
        let coordinator: CoordinatorStorage = ctx.load()?;
        let id = u64::try_from(request_id).map_err(|_| CoordinatorError::NonexistentRequest)?;
        let request = *coordinator
            .requests
            .get(&id)
            .ok_or(CoordinatorError::NonexistentRequest)?;

        let random_words: Vec<U256> = (0..request.num_words)
            .map(|index| utils::random_word(request_id, index))
            .collect();
        let callback = raffle_instruction::raw_fulfill_random_words_input(request_id, random_words);
        let success = match ctx.invoke(consumer, &callback) {
            Ok(_) => true,
            Err(err) => {
                warn!(request_id = id, %consumer, %err, "Consumer rejected random words");
                false
            }
        };

        // reload, the consumer ran in between
        let mut coordinator: CoordinatorStorage = ctx.load()?;
        let payment = coordinator.base_fee;
        let subscription = coordinator
            .subscriptions
            .get_mut(&request.subscription_id)
            .ok_or(CoordinatorError::InvalidSubscription)?;
        if subscription.balance < payment {
            return Err(CoordinatorError::InsufficientBalance.into());
        }
        subscription.balance -= payment;
        coordinator.requests.remove(&id);
        ctx.store(&coordinator)?;

        ctx.emit(
            VRFCoordinatorV2Mock::RandomWordsFulfilled {
                requestId: request_id,
                outputSeed: request_id,
                payment: U96::saturating_from(payment),
                success,
            }
            .encode_log_data(),
        );
        info!(request_id = id, %consumer, success, payment, "Random words fulfilled");
        Ok(Vec::new())
    }
}

fn to_u128(value: U256) -> Result<u128, ExecutionError> {
    u128::try_from(value).map_err(|_| Revert::panic(PANIC_ARITHMETIC).into())
}
