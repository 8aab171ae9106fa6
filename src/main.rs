use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use raffle_deploy::{config::DEFAULT_CONFIG_FILE, Config, DeployEnvironment};

#[derive(Parser, Debug)]
#[command(author, version, about = "Deploys the Raffle and its VRF coordinator mock")]
struct Args {
    /// Network configuration file
    #[arg(long, env = "RAFFLE_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Network to run against, defaults to the configured default network
    #[arg(long, env = "RAFFLE_NETWORK")]
    network: Option<String>,

    #[arg(long, env, default_value = "info")]
    log_level: Level,

    /// Format for logs, can be json or text
    #[arg(long, env, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the deploy scripts
    Deploy {
        /// Only run scripts carrying one of these tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Export the Raffle address and ABI to the front end
        #[arg(long)]
        update_front_end: bool,
    },
    /// List configured networks
    Networks,
}

fn init_tracing(args: &Args) {
    let log_level = args.log_level.to_string();
    if args.log_format.to_lowercase() == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::new(log_level))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(log_level))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();
    init_tracing(&args);

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let network = args
        .network
        .clone()
        .unwrap_or_else(|| config.default_network.clone());

    match args.command {
        Command::Deploy {
            tags,
            update_front_end,
        } => {
            let mut env = DeployEnvironment::connect(config, &network)
                .await
                .with_context(|| format!("connecting to {network}"))?;
            if update_front_end {
                env.set_update_front_end(true);
            }
            let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
            env.run(&tags).await.context("deploy failed")?;

            for (name, deployment) in env.deployments().iter() {
                info!(contract = name, address = %deployment.address, "deployment");
            }
        }
        Command::Networks => {
            for (name, network) in &config.networks {
                let kind = if config.is_development(name) {
                    "development"
                } else {
                    "live"
                };
                println!(
                    "{name}\tchain {}\t{kind}\t{} confirmation(s)",
                    network.chain_id, network.block_confirmations
                );
            }
        }
    }
    Ok(())
}
