mod common;

use std::{fs, sync::Arc};

use alloy_json_abi::JsonAbi;
use alloy_primitives::U256;
use raffle_deploy::{
    deploy::{front_end::AddressRegistry, raffle::VRF_SUB_FUND_AMOUNT},
    raffle_processor, vrf, Chain, CoordinatorError, CoordinatorEvent, DeployEnvironment, Error,
    LocalChain, RaffleState,
};

use common::{config, environment};

// Test the mocks tag deploys only the coordinator mock
#[tokio::test]
async fn test_mocks_tag_deploys_coordinator_only() {
    let (mut env, _chain) = environment("hardhat", 31337);

    env.run(&["mocks"]).await.unwrap();

    assert!(env.deployments().find(vrf::CONTRACT_NAME).is_some());
    assert!(env.deployments().find(raffle_processor::CONTRACT_NAME).is_none());
}

// Test the development deploy creates and funds a subscription
#[tokio::test]
async fn test_development_deploy_funds_subscription() {
    let (mut env, _chain) = environment("hardhat", 31337);
    env.run(&["all"]).await.unwrap();

    let deployer = env.named_accounts().unwrap().deployer;
    let coordinator = env.vrf_coordinator_mock(deployer).unwrap();
    let subscription = coordinator.subscription(1).await.unwrap();

    assert_eq!(subscription.balance, VRF_SUB_FUND_AMOUNT);
    assert_eq!(subscription.owner, deployer);
    assert_eq!(subscription.request_count, 0);

    // The raffle is registered as the subscription's consumer
    let raffle = env.deployments().get(raffle_processor::CONTRACT_NAME).unwrap();
    assert_eq!(subscription.consumers, vec![raffle.address]);
}

// Test only the subscription owner can add consumers
#[tokio::test]
async fn test_add_consumer_requires_subscription_owner() {
    let (mut env, _chain) = environment("hardhat", 31337);
    env.run(&["all"]).await.unwrap();

    let accounts = env.named_accounts().unwrap();
    let stranger = env.vrf_coordinator_mock(accounts.player).unwrap();
    let err = stranger.add_consumer(1, accounts.player).await.unwrap_err();
    assert_eq!(err.revert_reason().as_deref(), Some("MustBeSubOwner"));
    assert_eq!(
        err.revert().unwrap().coordinator_error(),
        Some(CoordinatorError::MustBeSubOwner {
            owner: accounts.deployer
        })
    );

    // The owner may add more, and a repeat changes nothing
    let owner = stranger.connect(accounts.deployer);
    let receipt = owner.add_consumer(1, accounts.player).await.unwrap();
    assert_eq!(
        receipt.events::<CoordinatorEvent>(),
        vec![CoordinatorEvent::ConsumerAdded {
            sub_id: 1,
            consumer: accounts.player
        }]
    );
    let receipt = owner.add_consumer(1, accounts.player).await.unwrap();
    assert!(receipt.logs.is_empty());
    assert_eq!(owner.subscription(1).await.unwrap().consumers.len(), 2);
}

// Test a non-development network skips the mocks and uses its coordinator
#[tokio::test]
async fn test_live_network_uses_configured_coordinator() {
    let (mut env, _chain) = environment("rinkeby", 4);
    assert!(!env.is_development());

    env.run(&["all"]).await.unwrap();

    assert!(env.deployments().find(vrf::CONTRACT_NAME).is_none());
    let deployer = env.named_accounts().unwrap().deployer;
    let raffle = env.raffle(deployer).unwrap();
    let params = env.config().chain_params(4).unwrap();
    assert_eq!(raffle.entrance_fee().await.unwrap(), params.entrance_fee);
    assert_eq!(raffle.interval().await.unwrap(), U256::from(params.interval));
}

// Test a chain without a configured coordinator cannot deploy the raffle
#[tokio::test]
async fn test_missing_coordinator_is_reported() {
    let mut config = config();
    config.chains.get_mut("4").unwrap().vrf_coordinator = None;
    let chain = Arc::new(LocalChain::new(4));
    let mut env = DeployEnvironment::local(config, "rinkeby", chain).unwrap();

    let err = env.run(&["raffle"]).await.unwrap_err();
    assert!(matches!(err, Error::MissingCoordinator(4)));
}

// Test an unknown network is refused
#[test]
fn test_unknown_network_is_refused() {
    let chain = Arc::new(LocalChain::default());
    let err = DeployEnvironment::local(config(), "mainnet", chain).unwrap_err();
    assert!(matches!(err, Error::UnknownNetwork(_)));
}

// Test a fixture restores the deployed state on every call
#[tokio::test]
async fn test_fixture_resets_state() {
    let (mut env, chain) = environment("hardhat", 31337);
    env.fixture(&["all"]).await.unwrap();

    let deployer = env.named_accounts().unwrap().deployer;
    let raffle = env.raffle(deployer).unwrap();
    let address = raffle.address();
    let fee = raffle.entrance_fee().await.unwrap();
    raffle.enter_raffle(fee).await.unwrap();
    assert_eq!(raffle.number_of_players().await.unwrap(), U256::from(1));

    env.fixture(&["all"]).await.unwrap();

    // Same contract, fresh round
    let raffle = env.raffle(deployer).unwrap();
    assert_eq!(raffle.address(), address);
    assert_eq!(raffle.number_of_players().await.unwrap(), U256::ZERO);
    assert_eq!(raffle.raffle_state().await.unwrap(), RaffleState::Open);
    assert_eq!(chain.balance(address).await.unwrap(), U256::ZERO);
}

// Test the front-end export runs as the last deploy script
#[tokio::test]
async fn test_deploy_updates_front_end() {
    let dir = tempfile::tempdir().unwrap();
    let address_file = dir.path().join("contractAddress.json");
    let abi_file = dir.path().join("abi.json");
    fs::write(&address_file, "{}").unwrap();

    let mut config = config();
    config.front_end.address_file = address_file.clone();
    config.front_end.abi_file = abi_file.clone();
    let chain = Arc::new(LocalChain::new(31337));
    let mut env = DeployEnvironment::local(config, "hardhat", chain).unwrap();
    env.set_update_front_end(true);

    env.run(&["all"]).await.unwrap();

    let raffle = env.deployments().get(raffle_processor::CONTRACT_NAME).unwrap();
    let registry: AddressRegistry =
        serde_json::from_str(&fs::read_to_string(&address_file).unwrap()).unwrap();
    assert_eq!(registry["31337"], serde_json::json!([raffle.address.to_checksum(None)]));

    let abi: JsonAbi = serde_json::from_str(&fs::read_to_string(&abi_file).unwrap()).unwrap();
    assert!(abi.function("enterRaffle").is_some());
    assert!(abi.event("WinnerPicked").is_some());
}

// Test the export stays off unless requested
#[tokio::test]
async fn test_front_end_untouched_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let address_file = dir.path().join("contractAddress.json");

    let mut config = config();
    config.front_end.address_file = address_file.clone();
    config.front_end.abi_file = dir.path().join("abi.json");
    let chain = Arc::new(LocalChain::new(31337));
    let mut env = DeployEnvironment::local(config, "hardhat", chain).unwrap();

    env.run(&[]).await.unwrap();

    assert!(!address_file.exists());
    assert!(!dir.path().join("abi.json").exists());
}
