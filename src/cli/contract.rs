//! Contract commands: deploy, call, code readback, token helpers, and raw
//! ABI encode/decode.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use ethers::types::U256;

use crate::abi as abi_codec;
use crate::cli::{load_signer, open_chain, parse_address, parse_wei};
use crate::contract::{self, CallOutcome};
use crate::error::{Error, Result};
use crate::registry::NetworkRegistry;
use crate::units::eth_to_wei;

#[derive(Args)]
pub struct DeployArgs {
    /// File holding the deployment bytecode as hex.
    #[arg(long)]
    code: PathBuf,
    /// ABI JSON document.
    #[arg(long)]
    abi: PathBuf,
    /// Constructor parameters as a call expression, e.g. "(42,true)".
    #[arg(long, default_value = "")]
    params: String,
    /// Key file of the deploying wallet.
    #[arg(long)]
    key: PathBuf,
    /// Key-file password (or EVMCTL_PASSWORD).
    #[arg(long)]
    password: Option<String>,
    /// Ether sent with the deployment.
    #[arg(long, default_value_t = 0.0)]
    value: f32,
}

pub async fn deploy(args: DeployArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let abi = contract::load_abi(&args.abi)?;
    let code = fs::read_to_string(&args.code)?;
    let code = code.trim();
    let bytecode = hex::decode(code.strip_prefix("0x").unwrap_or(code))
        .map_err(|_| Error::Other(format!("{} is not hex bytecode", args.code.display())))?;
    let signer = load_signer(&args.key, args.password.clone())?;

    let mut chain = open_chain(registry, network).await?;
    let (address, hash) = contract::deploy(
        chain.as_mut(),
        &abi,
        &bytecode,
        &args.params,
        signer.signer(),
        eth_to_wei(args.value),
    )
    .await?;
    println!("contract {address:#x} deploying in {hash:#x}");
    Ok(())
}

#[derive(Args)]
pub struct CallArgs {
    /// Contract address.
    #[arg(long)]
    contract: String,
    /// ABI JSON document.
    #[arg(long)]
    abi: PathBuf,
    /// Call expression, e.g. "transfer(0xabc...,100)".
    #[arg(long)]
    params: String,
    /// Key file signing a mutating call.
    #[arg(long)]
    key: PathBuf,
    /// Key-file password (or EVMCTL_PASSWORD).
    #[arg(long)]
    password: Option<String>,
    /// Ether sent with a payable call.
    #[arg(long, default_value_t = 0.0)]
    value: f32,
}

pub async fn call(args: CallArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let abi = contract::load_abi(&args.abi)?;
    let address = parse_address(&args.contract)?;
    let signer = load_signer(&args.key, args.password.clone())?;

    let mut chain = open_chain(registry, network).await?;
    let outcome = contract::call(
        chain.as_mut(),
        &abi,
        address,
        &args.params,
        signer.signer(),
        eth_to_wei(args.value),
    )
    .await?;
    match outcome {
        CallOutcome::Constant(values) => println!("({})", values.join(",")),
        CallOutcome::Transaction(hash) => println!("transaction {hash:#x}"),
    }
    Ok(())
}

#[derive(Args)]
pub struct CodeArgs {
    /// Contract address.
    contract: String,
}

pub async fn code(args: CodeArgs, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let address = parse_address(&args.contract)?;
    let mut chain = open_chain(registry, network).await?;
    let code = chain.code(address).await?;
    if code.is_empty() {
        println!("no code at {address:#x}");
    } else {
        println!("0x{}", hex::encode(&code));
    }
    Ok(())
}

#[derive(Subcommand)]
pub enum Erc20Command {
    /// Token balance of an owner.
    Balance {
        #[arg(long)]
        contract: String,
        owner: String,
    },
    /// Transfer tokens (raw token units).
    Transfer {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },
    /// Approve a spender (raw token units).
    Approve {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        spender: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },
}

pub async fn erc20(command: Erc20Command, registry: &NetworkRegistry, network: &str) -> Result<()> {
    let mut chain = open_chain(registry, network).await?;
    match command {
        Erc20Command::Balance { contract, owner } => {
            let balance = crate::contract::token::erc20_balance_of(
                chain.as_mut(),
                parse_address(&contract)?,
                parse_address(&owner)?,
            )
            .await?;
            println!("{balance}");
        }
        Erc20Command::Transfer {
            contract,
            to,
            amount,
            key,
            password,
        } => {
            let signer = load_signer(&key, password)?;
            let hash = crate::contract::token::erc20_transfer(
                chain.as_mut(),
                signer.signer(),
                parse_address(&contract)?,
                parse_address(&to)?,
                parse_wei(&amount)?,
            )
            .await?;
            println!("transaction {hash:#x}");
        }
        Erc20Command::Approve {
            contract,
            spender,
            amount,
            key,
            password,
        } => {
            let signer = load_signer(&key, password)?;
            let hash = crate::contract::token::erc20_approve(
                chain.as_mut(),
                signer.signer(),
                parse_address(&contract)?,
                parse_address(&spender)?,
                parse_wei(&amount)?,
            )
            .await?;
            println!("transaction {hash:#x}");
        }
    }
    Ok(())
}

#[derive(Subcommand)]
pub enum Erc721Command {
    /// Token count of an owner.
    Balance {
        #[arg(long)]
        contract: String,
        owner: String,
    },
    /// Transfer one token by id, checking ownership or approval first.
    Transfer {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        token_id: String,
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },
    /// Approve an operator for one token id.
    Approve {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        token_id: String,
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },
}

pub async fn erc721(
    command: Erc721Command,
    registry: &NetworkRegistry,
    network: &str,
) -> Result<()> {
    let mut chain = open_chain(registry, network).await?;
    match command {
        Erc721Command::Balance { contract, owner } => {
            let balance = crate::contract::token::erc721_balance_of(
                chain.as_mut(),
                parse_address(&contract)?,
                parse_address(&owner)?,
            )
            .await?;
            println!("{balance}");
        }
        Erc721Command::Transfer {
            contract,
            to,
            token_id,
            key,
            password,
        } => {
            let signer = load_signer(&key, password)?;
            let hash = crate::contract::token::erc721_transfer(
                chain.as_mut(),
                signer.signer(),
                parse_address(&contract)?,
                parse_address(&to)?,
                parse_token_id(&token_id)?,
            )
            .await?;
            println!("transaction {hash:#x}");
        }
        Erc721Command::Approve {
            contract,
            to,
            token_id,
            key,
            password,
        } => {
            let signer = load_signer(&key, password)?;
            let hash = crate::contract::token::erc721_approve(
                chain.as_mut(),
                signer.signer(),
                parse_address(&contract)?,
                parse_address(&to)?,
                parse_token_id(&token_id)?,
            )
            .await?;
            println!("transaction {hash:#x}");
        }
    }
    Ok(())
}

fn parse_token_id(text: &str) -> Result<U256> {
    U256::from_dec_str(text.trim()).map_err(|_| Error::Other(format!("'{text}' is not a token id")))
}

#[derive(Subcommand)]
pub enum AbiCommand {
    /// Encode a call expression against a signature.
    Encode {
        /// Declared signature, e.g. "transfer(address,uint256)".
        #[arg(long)]
        signature: String,
        /// Call expression, e.g. "transfer(0xabc...,100)".
        #[arg(long)]
        call: String,
        /// Leave out the 4-byte selector.
        #[arg(long)]
        no_selector: bool,
    },
    /// Decode calldata against a signature.
    Decode {
        /// Declared signature.
        #[arg(long)]
        signature: String,
        /// Hex calldata.
        #[arg(long)]
        data: String,
        /// The data does not start with a selector.
        #[arg(long)]
        no_selector: bool,
    },
}

pub fn abi(command: AbiCommand) -> Result<()> {
    match command {
        AbiCommand::Encode {
            signature,
            call,
            no_selector,
        } => {
            let data = abi_codec::encode(&signature, &call, !no_selector)?;
            println!("0x{}", hex::encode(data));
        }
        AbiCommand::Decode {
            signature,
            data,
            no_selector,
        } => {
            let data = data.trim();
            let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data))
                .map_err(|_| Error::Other(format!("'{data}' is not hex calldata")))?;
            println!("{}", abi_codec::decode(&signature, &bytes, !no_selector)?);
        }
    }
    Ok(())
}
