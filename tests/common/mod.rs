#![allow(dead_code)]

use std::{path::Path, sync::Arc};

use alloy_primitives::{Address, U256};
use raffle_deploy::{Config, DeployEnvironment, LocalChain, Raffle, VrfCoordinatorMock};

pub struct TestContext {
    pub env: DeployEnvironment,
    pub chain: Arc<LocalChain>,
    pub raffle: Raffle,
    pub coordinator: VrfCoordinatorMock,
    pub deployer: Address,
    pub entrance_fee: U256,
    pub interval: U256,
}

// Repository network config
pub fn config() -> Config {
    Config::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("raffle.toml")).unwrap()
}

// Environment on a fresh in-process chain
pub fn environment(network: &str, chain_id: u64) -> (DeployEnvironment, Arc<LocalChain>) {
    let chain = Arc::new(LocalChain::new(chain_id));
    let env = DeployEnvironment::local(config(), network, chain.clone()).unwrap();
    (env, chain)
}

// Deploy everything on the hardhat network and connect as the deployer
pub async fn setup() -> TestContext {
    let (mut env, chain) = environment("hardhat", 31337);
    env.fixture(&["all"]).await.unwrap();

    let deployer = env.named_accounts().unwrap().deployer;
    let raffle = env.raffle(deployer).unwrap();
    let coordinator = env.vrf_coordinator_mock(deployer).unwrap();
    let entrance_fee = raffle.entrance_fee().await.unwrap();
    let interval = raffle.interval().await.unwrap();

    TestContext {
        env,
        chain,
        raffle,
        coordinator,
        deployer,
        entrance_fee,
        interval,
    }
}

// Move the clock `interval + delta` seconds ahead and mine a block
pub fn pass_interval(chain: &LocalChain, interval: U256, delta: i64) {
    let seconds = interval.to::<u64>() as i64 + delta;
    chain.increase_time(seconds.max(0) as u64);
    chain.mine();
}
