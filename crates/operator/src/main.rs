//! HL Operator
//!
//! Runs one custody-signed action against Hyperliquid and its Arbitrum
//! bridge, then prints the outcome as JSON.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use action_engine::ActionDispatcher;
use anyhow::Result;
use clap::Parser;
use custody_core::api::{CustodyClient, ExchangeClient, RpcClient};
use custody_core::config::Config;
use custody_core::signing::SignerAdapter;
use custody_core::{Error, FailureCategory};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "hl-operator")]
#[command(about = "Execute a custody-signed Hyperliquid action")]
#[command(version)]
struct Cli {
    /// Action to run: deposit, withdraw, sendUsd, activateBigBlocks,
    /// deactivateBigBlocks or rawCall
    #[arg(long)]
    action: Option<String>,

    /// Human-readable USDC amount
    #[arg(long)]
    amount: Option<String>,

    /// Destination address for withdraw and sendUsd
    #[arg(long)]
    destination: Option<String>,

    /// Use Arbitrum Sepolia and the test exchange
    #[arg(long)]
    testnet: bool,

    /// TOML action file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Flags that take precedence over the environment and action file.
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(action) = &self.action {
            overrides.insert("ACTION".to_string(), action.clone());
        }
        if let Some(amount) = &self.amount {
            overrides.insert("AMOUNT".to_string(), amount.clone());
        }
        if let Some(destination) = &self.destination {
            overrides.insert("DESTINATION".to_string(), destination.clone());
        }
        if self.testnet {
            overrides.insert("IS_TESTNET".to_string(), "true".to_string());
        }
        overrides
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "operator=info,action_engine=info,custody_core=info".into());

    // Logs go to stderr so stdout carries only the outcome
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(err) => {
                    let category = FailureCategory::classify(err);
                    error!(error = %err, "{}", category.operator_message());
                }
                None => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides())?;
    info!(
        action = %config.action.action,
        testnet = config.action.is_testnet,
        vault = %config.custody.vault_address,
        "Starting HL Operator"
    );

    let custody = Arc::new(CustodyClient::new(
        &config.custody,
        config.network.profile.chain_id,
    )?);
    let signer = SignerAdapter::new(
        custody.clone(),
        config.custody.vault_address,
        config.custody_chain_id(),
    );
    let rpc = Arc::new(RpcClient::with_timeout(
        config.network.rpc_url.clone(),
        RPC_TIMEOUT,
    )?);
    let exchange = Arc::new(ExchangeClient::new(
        config.network.exchange_url.clone(),
        config.network.profile.clone(),
    ));

    let dispatcher = ActionDispatcher::new(rpc, custody, exchange, signer, config.network.clone());
    let outcome = dispatcher.dispatch(&config.action).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "hl-operator",
            "--action",
            "withdraw",
            "--amount",
            "3",
            "--destination",
            "0xabc",
            "--testnet",
        ])
        .unwrap();
        let overrides = cli.overrides();

        assert_eq!(overrides["ACTION"], "withdraw");
        assert_eq!(overrides["AMOUNT"], "3");
        assert_eq!(overrides["DESTINATION"], "0xabc");
        assert_eq!(overrides["IS_TESTNET"], "true");
    }

    #[test]
    fn test_no_flags_no_overrides() {
        let cli = Cli::try_parse_from(["hl-operator"]).unwrap();
        assert!(cli.overrides().is_empty());
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_config_path_flag() {
        let cli = Cli::try_parse_from(["hl-operator", "--config", "action.toml", "--json-logs"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("action.toml")));
        assert!(cli.json_logs);
    }
}
