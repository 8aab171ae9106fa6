// 00 - VRF coordinator mock, development networks only
use alloy_primitives::U256;
use async_trait::async_trait;
use tracing::info;

use super::{DeployEnvironment, DeployOptions, DeployScript};
use crate::{error::Result, raffle_instruction, vrf};

/// Premium per request: 0.25 LINK
pub const BASE_FEE: U256 = U256::from_limbs([250_000_000_000_000_000, 0, 0, 0]);
/// LINK per gas unit
pub const GAS_PRICE_LINK: U256 = U256::from_limbs([1_000_000_000, 0, 0, 0]);

pub struct DeployMocks;

#[async_trait]
impl DeployScript for DeployMocks {
    fn id(&self) -> &'static str {
        "00-deploy-mocks"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["all", "mocks"]
    }

    async fn run(&self, env: &mut DeployEnvironment) -> Result<()> {
        if !env.is_development() {
            return Ok(());
        }
        let deployer = env.named_accounts()?.deployer;

        info!("Local network detected: Deploying mocks");
        let options = DeployOptions {
            from: deployer,
            args: raffle_instruction::coordinator_constructor_args(BASE_FEE, GAS_PRICE_LINK),
            log: true,
            wait_confirmations: env.block_confirmations()?,
        };
        env.deploy(vrf::CONTRACT_NAME, options).await?;
        info!("Mocks deployed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::utils::parse_ether;

    #[test]
    fn test_constructor_constants() {
        assert_eq!(BASE_FEE, parse_ether("0.25").unwrap());
        assert_eq!(GAS_PRICE_LINK, U256::from(1_000_000_000u64));
    }
}
