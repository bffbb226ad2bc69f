//! Chain-level commands: balances, transfers, sweep, speed-up, endpoint and
//! block/tx inspection.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Args;
use ethers::types::{Address, H256, U256};
use tracing::info;

use crate::chain::eth::probe_endpoint;
use crate::chain::transfer;
use crate::cli::{load_signer, open_chain, parse_address, parse_wei, resolve_password};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::registry::NetworkRegistry;
use crate::sheet;
use crate::units::{eth_to_wei, wei_to_eth};
use crate::wallet;

#[derive(Args)]
pub struct BalanceArgs {
    /// Addresses to query.
    #[arg(required = true)]
    addresses: Vec<String>,
}

pub async fn balance(args: BalanceArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let mut chain = open_chain(registry, network).await?;
    for text in &args.addresses {
        let address = parse_address(text)?;
        let balance = chain.balance(address).await?;
        println!("{address:#x} {balance} wei (~{} eth)", wei_to_eth(balance));
    }
    Ok(())
}

#[derive(Args)]
pub struct TransferArgs {
    /// Key file of the sending wallet.
    #[arg(long)]
    key: PathBuf,
    /// Key-file password (or EVMCTL_PASSWORD).
    #[arg(long)]
    password: Option<String>,
    /// Comma-separated recipient addresses.
    #[arg(long, conflicts_with = "file")]
    to: Option<String>,
    /// Comma-separated ether amounts, one per recipient.
    #[arg(long, conflicts_with = "file")]
    value: Option<String>,
    /// CSV transfer list (index,from,to,value,notes) instead of --to/--value.
    #[arg(long)]
    file: Option<PathBuf>,
    /// CSV report of the per-recipient results.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn parse_recipients(args: &TransferArgs) -> Result<Vec<(Address, U256)>> {
    if let Some(file) = &args.file {
        let rows = sheet::read_transfer_rows(file)?;
        let mut recipients = Vec::with_capacity(rows.len());
        for row in rows {
            let to = parse_address(&row.to)
                .map_err(|e| Error::Other(format!("row {}: {e}", row.index)))?;
            let value: f32 = row
                .value
                .trim()
                .parse()
                .map_err(|_| Error::Other(format!("row {}: bad value '{}'", row.index, row.value)))?;
            recipients.push((to, eth_to_wei(value)));
        }
        return Ok(recipients);
    }

    let (Some(to), Some(value)) = (&args.to, &args.value) else {
        return Err(Error::Other(
            "either --file or both --to and --value are required".to_string(),
        ));
    };
    let addresses: Vec<&str> = to.split(',').collect();
    let values: Vec<&str> = value.split(',').collect();
    if addresses.len() != values.len() {
        return Err(Error::Other(format!(
            "{} recipients but {} values",
            addresses.len(),
            values.len()
        )));
    }
    addresses
        .iter()
        .zip(values)
        .map(|(to, value)| {
            let to = parse_address(to)?;
            let value: f32 = value
                .trim()
                .parse()
                .map_err(|_| Error::Other(format!("bad ether amount '{value}'")))?;
            Ok((to, eth_to_wei(value)))
        })
        .collect()
}

pub async fn transfer(
    args: TransferArgs,
    registry: &NetworkRegistry,
    network: &str,
    settings: &Settings,
) -> Result<()> {
    let recipients = parse_recipients(&args)?;
    let signer = load_signer(&args.key, args.password.clone())?;
    let mut chain = open_chain(registry, network).await?;

    let outcomes = transfer::transfer_batch(
        chain.as_mut(),
        signer.signer(),
        &recipients,
        settings.transfer_gas,
    )
    .await?;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(hash) => eprintln!("{:#x} <- {} wei: {hash:#x}", outcome.to, outcome.amount),
            Err(e) => {
                failed += 1;
                eprintln!("{:#x} <- {} wei: FAILED ({e})", outcome.to, outcome.amount);
            }
        }
    }
    if let Some(report) = &args.report {
        let sender = format!("{:#x}", signer.address());
        let rows: Vec<sheet::TransferRow> = outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| sheet::TransferRow {
                index: i as u64 + 1,
                from: sender.clone(),
                to: format!("{:#x}", outcome.to),
                value: outcome.amount.to_string(),
                notes: match &outcome.result {
                    Ok(hash) => format!("{hash:#x}"),
                    Err(e) => format!("failed: {e}"),
                },
            })
            .collect();
        sheet::write_transfer_rows(report, &rows)?;
    }
    info!(sent = outcomes.len() - failed, failed, "transfer batch done");
    println!("{} sent, {} failed", outcomes.len() - failed, failed);
    Ok(())
}

#[derive(Args)]
pub struct SweepArgs {
    /// Directory of key files to drain.
    #[arg(long)]
    keydir: PathBuf,
    /// Key-file password (or EVMCTL_PASSWORD).
    #[arg(long)]
    password: Option<String>,
    /// Address receiving the swept funds.
    #[arg(long)]
    to: String,
}

pub async fn sweep(
    args: SweepArgs,
    registry: &NetworkRegistry,
    network: &str,
    settings: &Settings,
) -> Result<()> {
    let password = resolve_password(args.password.clone())?;
    let sources = wallet::load_key_files(&args.keydir, &password)?;
    if sources.is_empty() {
        return Err(Error::Other(format!(
            "no key files under {}",
            args.keydir.display()
        )));
    }
    let to = parse_address(&args.to)?;
    let signers: Vec<_> = sources.iter().map(|w| w.signer().clone()).collect();

    let mut chain = open_chain(registry, network).await?;
    let outcomes = transfer::sweep(
        chain.as_mut(),
        &signers,
        to,
        settings.transfer_gas,
        settings.sweep_margin_num,
        settings.sweep_margin_den,
    )
    .await?;

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(hash) => eprintln!("{:#x} -> {} wei: {hash:#x}", outcome.from, outcome.amount),
            Err(e) => {
                failed += 1;
                eprintln!("{:#x}: FAILED ({e})", outcome.from);
            }
        }
    }
    println!(
        "{} swept, {} failed, {} skipped",
        outcomes.len() - failed,
        failed,
        signers.len() - outcomes.len()
    );
    Ok(())
}

#[derive(Args)]
pub struct SpeedupArgs {
    /// Hash of the pending transaction.
    hash: String,
    /// New gas price in wei.
    #[arg(long)]
    gas_price: String,
    /// Key file of the original sender.
    #[arg(long)]
    key: PathBuf,
    /// Key-file password (or EVMCTL_PASSWORD).
    #[arg(long)]
    password: Option<String>,
}

pub async fn speedup(args: SpeedupArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let hash = parse_hash(&args.hash)?;
    let gas_price = parse_wei(&args.gas_price)?;
    let signer = load_signer(&args.key, args.password.clone())?;
    let mut chain = open_chain(registry, network).await?;
    let replacement = transfer::speed_up(chain.as_mut(), signer.signer(), hash, gas_price).await?;
    println!("replacement transaction {replacement:#x}");
    Ok(())
}

#[derive(Args)]
pub struct RpcArgs {
    /// Probe every registered network, not just the selected one.
    #[arg(long)]
    all: bool,
}

pub async fn rpc(args: RpcArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let descriptors: Vec<_> = if args.all {
        registry.all().to_vec()
    } else {
        vec![registry.by_name(network)?.clone()]
    };
    for descriptor in descriptors {
        for url in &descriptor.rpc {
            match probe_endpoint(url).await {
                Ok((id, elapsed)) if id == U256::from(descriptor.id) => {
                    println!("{:<12} {url} {}ms", descriptor.name, elapsed.as_millis());
                }
                Ok((id, _)) => {
                    println!(
                        "{:<12} {url} WRONG CHAIN (reports {id}, registry says {})",
                        descriptor.name, descriptor.id
                    );
                }
                Err(e) => println!("{:<12} {url} UNREACHABLE ({e})", descriptor.name),
            }
        }
    }
    Ok(())
}

pub async fn gas(registry: &NetworkRegistry, network: &str) -> Result<()> {
    let mut chain = open_chain(registry, network).await?;
    let price = chain.gas_price().await?;
    println!("{price} wei");
    Ok(())
}

#[derive(Args)]
pub struct BlockArgs {
    /// Block number or a 0x-prefixed 32-byte hash; the latest block when
    /// omitted.
    block: Option<String>,
}

pub async fn block(args: BlockArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let mut chain = open_chain(registry, network).await?;
    let selector = match args.block {
        Some(block) => block,
        None => chain.block_number().await?.to_string(),
    };
    let found = if looks_like_hash(&selector) {
        chain.block_by_hash(parse_hash(&selector)?).await?
    } else {
        let number: u64 = selector
            .parse()
            .map_err(|_| Error::Other(format!("'{selector}' is not a block number or hash")))?;
        chain.block_by_number(number).await?
    };
    let block = found.ok_or_else(|| Error::NotFound(format!("block {selector}")))?;
    println!(
        "number={} hash={} timestamp={} transactions={}",
        block.number.map(|n| n.to_string()).unwrap_or_else(|| "pending".into()),
        block
            .hash
            .map(|h| format!("{h:#x}"))
            .unwrap_or_else(|| "pending".into()),
        block.timestamp,
        block.transactions.len()
    );
    Ok(())
}

#[derive(Args)]
pub struct TxArgs {
    /// Transaction hash.
    hash: String,
}

pub async fn tx(args: TxArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let hash = parse_hash(&args.hash)?;
    let mut chain = open_chain(registry, network).await?;
    let (tx, pending) = chain
        .transaction(hash)
        .await?
        .ok_or_else(|| Error::NotFound(format!("transaction {hash:#x}")))?;

    let to = tx
        .to
        .map(|a| format!("{a:#x}"))
        .unwrap_or_else(|| "(contract creation)".into());
    if pending {
        println!("pending: from={:#x} to={to} value={} nonce={}", tx.from, tx.value, tx.nonce);
        return Ok(());
    }
    let status = match chain.receipt(hash).await? {
        Some(receipt) => match receipt.status.map(|s| s.as_u64()) {
            Some(1) => "success".to_string(),
            Some(_) => "reverted".to_string(),
            None => "unknown".to_string(),
        },
        None => "no receipt".to_string(),
    };
    println!(
        "mined in block {}: from={:#x} to={to} value={} status={status}",
        tx.block_number.map(|n| n.to_string()).unwrap_or_default(),
        tx.from,
        tx.value
    );
    Ok(())
}

fn looks_like_hash(text: &str) -> bool {
    text.starts_with("0x") && text.len() == 66
}

pub(crate) fn parse_hash(text: &str) -> Result<H256> {
    H256::from_str(text).map_err(|_| Error::Other(format!("'{text}' is not a 32-byte hash")))
}
