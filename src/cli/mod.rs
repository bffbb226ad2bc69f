//! Command-line interface.

mod chain;
mod contract;
mod key;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ethers::types::{Address, U256};
use tracing::debug;

use crate::abi::coerce::{to_typed, ScalarKind};
use crate::chain::{new_chain, Chain};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::price::PriceClient;
use crate::registry::NetworkRegistry;
use crate::wallet::Wallet;

#[derive(Parser)]
#[command(name = "evmctl", version, about = "Tools for Ethereum-compatible chains")]
pub struct Cli {
    /// Network name from the registry.
    #[arg(long, global = true)]
    network: Option<String>,

    /// Path of the network registry JSON document.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Native-currency balances of one or more addresses.
    Balance(chain::BalanceArgs),
    /// Send native currency to one or more recipients.
    Transfer(chain::TransferArgs),
    /// Drain every key in a directory into one address.
    Sweep(chain::SweepArgs),
    /// Rebroadcast a pending transaction with a higher gas price.
    Speedup(chain::SpeedupArgs),
    /// Probe the registered RPC endpoints and report latency.
    Rpc(chain::RpcArgs),
    /// Current gas price.
    Gas,
    /// Block summary by number or hash.
    Block(chain::BlockArgs),
    /// Transaction status by hash.
    Tx(chain::TxArgs),
    /// Deploy a contract from bytecode and an ABI document.
    Deploy(contract::DeployArgs),
    /// Call a contract method through its ABI document.
    Call(contract::CallArgs),
    /// Deployed bytecode at an address.
    Code(contract::CodeArgs),
    /// ERC-20 token operations.
    #[command(subcommand)]
    Erc20(contract::Erc20Command),
    /// ERC-721 token operations.
    #[command(subcommand)]
    Erc721(contract::Erc721Command),
    /// Raw ABI encode/decode against a declared signature.
    #[command(subcommand)]
    Abi(contract::AbiCommand),
    /// Encrypted key-file management.
    #[command(subcommand)]
    Key(key::KeyCommand),
    /// Latest token quotes.
    Price(PriceArgs),
    /// List the registered networks.
    Networks,
}

#[derive(clap::Args)]
pub struct PriceArgs {
    /// Comma-separated token symbols, e.g. "ETH,BTC".
    symbols: String,
    /// Quote currency.
    #[arg(long, default_value = "USD")]
    convert: String,
}

impl Cli {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let registry_path = self
            .registry
            .clone()
            .unwrap_or_else(|| settings.registry_path.clone());
        let registry = if registry_path.is_file() {
            NetworkRegistry::load(&registry_path)?
        } else {
            debug!(path = %registry_path.display(), "no registry file, using the built-in set");
            NetworkRegistry::builtin()
        };
        let network = self
            .network
            .clone()
            .unwrap_or_else(|| settings.default_network.clone());

        match self.command {
            Commands::Balance(args) => chain::balance(args, &registry, &network).await,
            Commands::Transfer(args) => chain::transfer(args, &registry, &network, settings).await,
            Commands::Sweep(args) => chain::sweep(args, &registry, &network, settings).await,
            Commands::Speedup(args) => chain::speedup(args, &registry, &network).await,
            Commands::Rpc(args) => chain::rpc(args, &registry, &network).await,
            Commands::Gas => chain::gas(&registry, &network).await,
            Commands::Block(args) => chain::block(args, &registry, &network).await,
            Commands::Tx(args) => chain::tx(args, &registry, &network).await,
            Commands::Deploy(args) => contract::deploy(args, &registry, &network).await,
            Commands::Call(args) => contract::call(args, &registry, &network).await,
            Commands::Code(args) => contract::code(args, &registry, &network).await,
            Commands::Erc20(command) => contract::erc20(command, &registry, &network).await,
            Commands::Erc721(command) => contract::erc721(command, &registry, &network).await,
            Commands::Abi(command) => contract::abi(command),
            Commands::Key(command) => key::run(command, settings),
            Commands::Price(args) => price(args, settings).await,
            Commands::Networks => {
                for descriptor in registry.all() {
                    println!(
                        "{:<12} id={:<8} {:<6} test={} rpc={}",
                        descriptor.name,
                        descriptor.id,
                        descriptor.currency,
                        descriptor.is_test,
                        descriptor.rpc.len()
                    );
                }
                Ok(())
            }
        }
    }
}

async fn price(args: PriceArgs, settings: &Settings) -> Result<()> {
    let api_key = settings
        .price_api_key
        .as_deref()
        .ok_or_else(|| Error::Other("PRICE_API_KEY is not set".to_string()))?;
    let client = PriceClient::new(&settings.price_api_url, api_key);
    for quote in client.quotes(&args.symbols, &args.convert).await? {
        println!(
            "{:<8} {:<20} rank={:<5} price={:.6} {} market_cap={:.0}",
            quote.symbol,
            quote.name,
            quote.rank.map(|r| r.to_string()).unwrap_or_default(),
            quote.price,
            args.convert,
            quote.market_cap
        );
    }
    Ok(())
}

/// Connect to the named network with identity verification.
pub(crate) async fn open_chain(
    registry: &NetworkRegistry,
    network: &str,
) -> Result<Box<dyn Chain>> {
    let descriptor = registry.by_name(network)?.clone();
    let mut chain = new_chain(descriptor);
    chain.connect(&[], true).await?;
    Ok(chain)
}

/// Parse an address argument with the coercion rules (short hex is
/// left-padded).
pub(crate) fn parse_address(text: &str) -> Result<Address> {
    match to_typed(text, ScalarKind::Address)? {
        ethers_core::abi::Token::Address(address) => Ok(address),
        _ => Err(Error::Other(format!("'{text}' is not an address"))),
    }
}

/// Parse a decimal wei amount.
pub(crate) fn parse_wei(text: &str) -> Result<U256> {
    U256::from_dec_str(text.trim())
        .map_err(|_| Error::Other(format!("'{text}' is not a wei amount")))
}

/// Resolve the key-file password: flag first, then EVMCTL_PASSWORD.
pub(crate) fn resolve_password(flag: Option<String>) -> Result<String> {
    match flag {
        Some(password) => Ok(password),
        None => std::env::var("EVMCTL_PASSWORD")
            .map_err(|_| Error::Other("no password given and EVMCTL_PASSWORD is not set".into())),
    }
}

/// Load the signing wallet behind a key file.
pub(crate) fn load_signer(path: &PathBuf, password: Option<String>) -> Result<Wallet> {
    let password = resolve_password(password)?;
    Wallet::load(path.clone(), &password)
}
