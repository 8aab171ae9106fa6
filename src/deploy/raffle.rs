// 01 - Raffle
use alloy_primitives::U256;
use async_trait::async_trait;
use tracing::info;

use super::{DeployEnvironment, DeployOptions, DeployScript};
use crate::{
    error::{Error, Result},
    raffle_instruction, raffle_processor, utils,
};

/// LINK credited to the mock subscription: 2 LINK
pub const VRF_SUB_FUND_AMOUNT: U256 = U256::from_limbs([2_000_000_000_000_000_000, 0, 0, 0]);

pub struct DeployRaffle;

#[async_trait]
impl DeployScript for DeployRaffle {
    fn id(&self) -> &'static str {
        "01-deploy-raffle"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["all", "raffle"]
    }

    async fn run(&self, env: &mut DeployEnvironment) -> Result<()> {
        let deployer = env.named_accounts()?.deployer;
        let chain_id = env.chain_id();
        let params = env.config().chain_params(chain_id)?.clone();

        let mock = if env.is_development() {
            Some(env.vrf_coordinator_mock(deployer)?)
        } else {
            None
        };
        let (vrf_coordinator, subscription_id) = if let Some(coordinator) = &mock {
            let (_, sub_id) = coordinator.create_subscription().await?;
            coordinator.fund_subscription(sub_id, VRF_SUB_FUND_AMOUNT).await?;
            info!(sub_id, amount = %utils::wei_to_ether(VRF_SUB_FUND_AMOUNT), "funded mock subscription");
            (coordinator.address(), sub_id)
        } else {
            let coordinator = params
                .vrf_coordinator
                .ok_or(Error::MissingCoordinator(chain_id))?;
            (coordinator, params.subscription_id)
        };

        let args = raffle_instruction::raffle_constructor_args(
            vrf_coordinator,
            params.entrance_fee,
            params.gas_lane,
            subscription_id,
            params.callback_gas_limit,
            U256::from(params.interval),
        );
        let options = DeployOptions {
            from: deployer,
            args,
            log: true,
            wait_confirmations: env.block_confirmations()?,
        };
        let raffle = env.deploy(raffle_processor::CONTRACT_NAME, options).await?;
        if let Some(coordinator) = &mock {
            coordinator.add_consumer(subscription_id, raffle.address).await?;
        }
        info!(
            chain = %params.name,
            entrance_fee = %utils::wei_to_ether(params.entrance_fee),
            interval = params.interval,
            "Raffle deployed"
        );
        Ok(())
    }
}
