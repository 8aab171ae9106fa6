//! Deploy scripts and the environment they run in.
//!
//! Scripts run in id order and are filtered by tag. [`DeployEnvironment`]
//! plays the part of the deployment runtime: it knows the active network,
//! holds the chain connection, the named accounts and the bookkeeping, and
//! deploys contracts by name.

pub mod front_end;
pub mod mocks;
pub mod raffle;

use std::{collections::HashMap, sync::Arc};

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use tracing::info;

use crate::{
    artifacts::ArtifactSource,
    chain::Chain,
    config::{Config, FrontEndConfig, NetworkConfig},
    contract::{Raffle, VrfCoordinatorMock},
    deployments::{Deployment, Deployments},
    error::{Error, Result},
    live_chain::LiveChain,
    local_chain::LocalChain,
    raffle_processor, vrf,
};

/// A deployment step with an id and the tags that select it
#[async_trait]
pub trait DeployScript: Send + Sync {
    fn id(&self) -> &'static str;

    fn tags(&self) -> &'static [&'static str];

    async fn run(&self, env: &mut DeployEnvironment) -> Result<()>;
}

/// Every script, in execution order
pub fn scripts() -> Vec<Box<dyn DeployScript>> {
    vec![
        Box::new(mocks::DeployMocks),
        Box::new(raffle::DeployRaffle),
        Box::new(front_end::UpdateFrontEnd),
    ]
}

fn selected(script: &dyn DeployScript, tags: &[&str]) -> bool {
    tags.is_empty() || script.tags().iter().any(|tag| tags.contains(tag))
}

/// Accounts resolved from the named account indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedAccounts {
    pub deployer: Address,
    pub player: Address,
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub from: Address,
    pub args: Bytes,
    pub log: bool,
    pub wait_confirmations: u64,
}

#[derive(Debug, Clone)]
struct Fixture {
    snapshot: u64,
    deployments: Deployments,
}

#[derive(Debug)]
pub struct DeployEnvironment {
    config: Config,
    network: String,
    chain: Arc<dyn Chain>,
    local: Option<Arc<LocalChain>>,
    deployments: Deployments,
    artifacts: ArtifactSource,
    update_front_end: bool,
    fixtures: HashMap<String, Fixture>,
}

impl DeployEnvironment {
    /// Run `network` on an in-process chain with in-memory bookkeeping
    pub fn local(config: Config, network: &str, chain: Arc<LocalChain>) -> Result<Self> {
        config.network(network)?;
        Ok(Self {
            config,
            network: network.to_string(),
            chain: chain.clone(),
            local: Some(chain),
            deployments: Deployments::in_memory(network),
            artifacts: ArtifactSource::Native,
            update_front_end: false,
            fixtures: HashMap::new(),
        })
    }

    /// Connect to `network`: over RPC when it has a URL, in-process otherwise.
    /// The front-end export follows the `UPDATE_FRONT_END` variable.
    pub async fn connect(config: Config, network: &str) -> Result<Self> {
        let network_config = config.network(network)?.clone();
        let mut env = match network_config.rpc_url()? {
            Some(url) => {
                let chain = LiveChain::connect(url, &network_config.private_keys()?).await?;
                let deployments_dir = config.resolve(&config.deployments.dir);
                let deployments = Deployments::open(&deployments_dir, network, chain.chain_id())?;
                let artifacts = ArtifactSource::Directory(config.resolve(&config.artifacts.dir));
                Self {
                    config,
                    network: network.to_string(),
                    chain: Arc::new(chain),
                    local: None,
                    deployments,
                    artifacts,
                    update_front_end: false,
                    fixtures: HashMap::new(),
                }
            }
            None => {
                let chain = Arc::new(LocalChain::new(network_config.chain_id));
                Self::local(config, network, chain)?
            }
        };
        env.update_front_end = front_end::update_requested();
        info!(network, chain_id = env.chain_id(), "deploy environment ready");
        Ok(env)
    }

    pub fn network_name(&self) -> &str {
        &self.network
    }

    pub fn network_config(&self) -> Result<&NetworkConfig> {
        self.config.network(&self.network)
    }

    /// Whether the active network gets mocks
    pub fn is_development(&self) -> bool {
        self.config.is_development(&self.network)
    }

    pub fn block_confirmations(&self) -> Result<u64> {
        Ok(self.network_config()?.block_confirmations)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn chain(&self) -> Arc<dyn Chain> {
        self.chain.clone()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    /// The in-process chain, `None` on live networks
    pub fn local_chain(&self) -> Option<&Arc<LocalChain>> {
        self.local.as_ref()
    }

    pub fn deployments(&self) -> &Deployments {
        &self.deployments
    }

    pub fn update_front_end(&self) -> bool {
        self.update_front_end
    }

    pub fn set_update_front_end(&mut self, update: bool) {
        self.update_front_end = update;
    }

    /// Front-end files with paths resolved against the config directory
    pub fn front_end_files(&self) -> FrontEndConfig {
        FrontEndConfig {
            address_file: self.config.resolve(&self.config.front_end.address_file),
            abi_file: self.config.resolve(&self.config.front_end.abi_file),
        }
    }

    pub fn named_accounts(&self) -> Result<NamedAccounts> {
        let indices = self.config.named_accounts;
        let signers = self.chain.signers();
        let account = |index: usize| signers.get(index).copied().ok_or(Error::MissingSigner(index));
        Ok(NamedAccounts {
            deployer: account(indices.deployer)?,
            player: account(indices.player)?,
        })
    }

    /// Deploy contract `name` and record it in the bookkeeping
    pub async fn deploy(&mut self, name: &str, options: DeployOptions) -> Result<Deployment> {
        let artifact = self.artifacts.artifact(name)?;
        if options.log {
            info!(contract = name, from = %options.from, "deploying");
        }
        let receipt = self
            .chain
            .deploy(
                options.from,
                &artifact,
                options.args.clone(),
                options.wait_confirmations,
            )
            .await?;
        let address = receipt
            .contract_address
            .ok_or_else(|| Error::MissingDeployment {
                network: self.network.clone(),
                name: name.to_string(),
            })?;
        if options.log {
            info!(
                contract = name,
                tx = %receipt.transaction_hash,
                %address,
                block = receipt.block_number,
                "deployed"
            );
        }
        let deployment = Deployment {
            address,
            abi: artifact.abi,
            args: options.args,
            transaction_hash: Some(receipt.transaction_hash),
            block_number: Some(receipt.block_number),
        };
        self.deployments.save(name, deployment.clone())?;
        Ok(deployment)
    }

    /// Run the scripts selected by `tags`; no tags runs every script
    pub async fn run(&mut self, tags: &[&str]) -> Result<()> {
        for script in scripts() {
            if !selected(script.as_ref(), tags) {
                continue;
            }
            info!(script = script.id(), network = %self.network, "running deploy script");
            script.run(self).await?;
        }
        Ok(())
    }

    /// Run `tags` once per environment, then revert to that state on every
    /// later call. Only the in-process network supports fixtures.
    pub async fn fixture(&mut self, tags: &[&str]) -> Result<()> {
        let local = self
            .local
            .clone()
            .ok_or_else(|| Error::FixtureUnsupported(self.network.clone()))?;
        let key = tags.join(",");

        if let Some(saved) = self.fixtures.get_mut(&key) {
            if local.revert(saved.snapshot) {
                self.deployments = saved.deployments.clone();
                saved.snapshot = local.snapshot();
                return Ok(());
            }
        }

        self.run(tags).await?;
        let fixture = Fixture {
            snapshot: local.snapshot(),
            deployments: self.deployments.clone(),
        };
        self.fixtures.insert(key, fixture);
        Ok(())
    }

    /// Raffle client for the deployed Raffle, signing as `signer`
    pub fn raffle(&self, signer: Address) -> Result<Raffle> {
        let deployment = self.deployments.get(raffle_processor::CONTRACT_NAME)?;
        Ok(Raffle::new(self.chain.clone(), deployment.address, signer)
            .with_confirmations(self.block_confirmations()?))
    }

    pub fn vrf_coordinator_mock(&self, signer: Address) -> Result<VrfCoordinatorMock> {
        let deployment = self.deployments.get(vrf::CONTRACT_NAME)?;
        Ok(VrfCoordinatorMock::new(self.chain.clone(), deployment.address, signer)
            .with_confirmations(self.block_confirmations()?))
    }
}
