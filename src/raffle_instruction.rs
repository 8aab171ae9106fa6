//! Call builders for the Raffle and the VRF coordinator mock.
//!
//! Each builder returns a [`CallRequest`] ready for [`Chain::call`] or
//! [`Chain::send`]; the typed clients in [`crate::contract`] are thin
//! wrappers around them.
//!
//! [`Chain::call`]: crate::chain::Chain::call
//! [`Chain::send`]: crate::chain::Chain::send

use alloy_primitives::{aliases::U96, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    bindings::{IRaffle, VRFCoordinatorV2Mock},
    chain::CallRequest,
};

/// Create an `enterRaffle` call paying `value`
///
/// Accounts:
/// 0. `[signer]` The player, pays the entrance fee
/// 1. `[]` The raffle
pub fn enter_raffle(raffle: Address, player: Address, value: U256) -> CallRequest {
    CallRequest::new(player, raffle, IRaffle::enterRaffleCall {}.abi_encode()).with_value(value)
}

/// Create a `checkUpkeep("")` call, meant to be simulated
pub fn check_upkeep(raffle: Address, caller: Address) -> CallRequest {
    let input = IRaffle::checkUpkeepCall {
        checkData: Bytes::new(),
    }
    .abi_encode();
    CallRequest::new(caller, raffle, input)
}

/// Create a `performUpkeep("")` call
///
/// Anyone may send it; it only succeeds while `checkUpkeep` is true.
pub fn perform_upkeep(raffle: Address, caller: Address) -> CallRequest {
    let input = IRaffle::performUpkeepCall {
        performData: Bytes::new(),
    }
    .abi_encode();
    CallRequest::new(caller, raffle, input)
}

pub fn get_player(raffle: Address, caller: Address, index: U256) -> CallRequest {
    CallRequest::new(caller, raffle, IRaffle::getPlayerCall { index }.abi_encode())
}

/// Create a call from any typed contract call
pub fn query<C: SolCall>(contract: Address, caller: Address, call: &C) -> CallRequest {
    CallRequest::new(caller, contract, call.abi_encode())
}

/// Create a `createSubscription` call; the sender owns the subscription
pub fn create_subscription(coordinator: Address, owner: Address) -> CallRequest {
    let input = VRFCoordinatorV2Mock::createSubscriptionCall {}.abi_encode();
    CallRequest::new(owner, coordinator, input)
}

/// Create a `fundSubscription` call crediting `amount` juels of LINK
pub fn fund_subscription(
    coordinator: Address,
    funder: Address,
    sub_id: u64,
    amount: U256,
) -> CallRequest {
    let input = VRFCoordinatorV2Mock::fundSubscriptionCall {
        subId: sub_id,
        amount: U96::saturating_from(amount),
    }
    .abi_encode();
    CallRequest::new(funder, coordinator, input)
}

/// Create an `addConsumer` call; only the subscription owner may send it
pub fn add_consumer(coordinator: Address, owner: Address, sub_id: u64, consumer: Address) -> CallRequest {
    let input = VRFCoordinatorV2Mock::addConsumerCall {
        subId: sub_id,
        consumer,
    }
    .abi_encode();
    CallRequest::new(owner, coordinator, input)
}

pub fn get_subscription(coordinator: Address, caller: Address, sub_id: u64) -> CallRequest {
    let input = VRFCoordinatorV2Mock::getSubscriptionCall { subId: sub_id }.abi_encode();
    CallRequest::new(caller, coordinator, input)
}

/// Create a `fulfillRandomWords` call delivering words for `request_id` to `consumer`
pub fn fulfill_random_words(
    coordinator: Address,
    caller: Address,
    request_id: U256,
    consumer: Address,
) -> CallRequest {
    let input = VRFCoordinatorV2Mock::fulfillRandomWordsCall {
        requestId: request_id,
        consumer,
    }
    .abi_encode();
    CallRequest::new(caller, coordinator, input)
}

/// Calldata of the `requestRandomWords` call a consumer makes on the coordinator
pub fn request_random_words_input(
    key_hash: B256,
    sub_id: u64,
    request_confirmations: u16,
    callback_gas_limit: u32,
    num_words: u32,
) -> Vec<u8> {
    VRFCoordinatorV2Mock::requestRandomWordsCall {
        keyHash: key_hash,
        subId: sub_id,
        minimumRequestConfirmations: request_confirmations,
        callbackGasLimit: callback_gas_limit,
        numWords: num_words,
    }
    .abi_encode()
}

/// Calldata of the callback the coordinator makes on a consumer
pub fn raw_fulfill_random_words_input(request_id: U256, random_words: Vec<U256>) -> Vec<u8> {
    IRaffle::rawFulfillRandomWordsCall {
        requestId: request_id,
        randomWords: random_words,
    }
    .abi_encode()
}

/// Constructor arguments of the VRF coordinator mock
pub fn coordinator_constructor_args(base_fee: U256, gas_price_link: U256) -> Bytes {
    use alloy_sol_types::SolValue;
    (base_fee, gas_price_link).abi_encode_params().into()
}

/// Constructor arguments of the Raffle, in declaration order
pub fn raffle_constructor_args(
    vrf_coordinator: Address,
    entrance_fee: U256,
    gas_lane: B256,
    subscription_id: u64,
    callback_gas_limit: u32,
    interval: U256,
) -> Bytes {
    use alloy_sol_types::SolValue;
    (
        vrf_coordinator,
        entrance_fee,
        gas_lane,
        subscription_id,
        callback_gas_limit,
        interval,
    )
        .abi_encode_params()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_raffle_carries_value_and_selector() {
        let raffle = Address::repeat_byte(1);
        let player = Address::repeat_byte(2);
        let request = enter_raffle(raffle, player, U256::from(5));

        assert_eq!(request.from, player);
        assert_eq!(request.to, raffle);
        assert_eq!(request.value, U256::from(5));
        assert_eq!(&request.input[..], &IRaffle::enterRaffleCall::SELECTOR[..]);
    }

    #[test]
    fn test_raffle_constructor_args_are_static_words() {
        let args = raffle_constructor_args(
            Address::ZERO,
            U256::from(1),
            B256::ZERO,
            1,
            500_000,
            U256::from(30),
        );
        assert_eq!(args.len(), 6 * 32);
    }
}
