//! Generic contract deployment and calls driven by an ABI document.

pub mod token;

use std::fs;
use std::path::Path;

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionRequest, H256, U256};
use ethers_core::abi::{Abi, ParamType, StateMutability, Token};
use ethers_core::utils::get_contract_address;
use tracing::debug;

use crate::abi::coerce::{to_text, ArgKind, ScalarKind};
use crate::abi::{coerce_arguments, parse_call};
use crate::chain::Chain;
use crate::error::{ArgumentError, Error, Result};

/// Parse an ABI JSON document from disk.
pub fn load_abi(path: &Path) -> Result<Abi> {
    let data = fs::read_to_string(path)?;
    let abi: Abi = serde_json::from_str(&data)?;
    Ok(abi)
}

/// What a contract call produced: rendered outputs for a constant method,
/// a transaction hash for a mutating one.
pub enum CallOutcome {
    Constant(Vec<String>),
    Transaction(H256),
}

/// Deploy a contract.
///
/// `params` is a call expression with an empty method name, e.g. `(42,true)`
/// (or empty for a parameterless constructor), coerced against the
/// constructor inputs declared by the ABI. Returns the predicted contract
/// address and the deployment transaction hash.
pub async fn deploy(
    chain: &mut dyn Chain,
    abi: &Abi,
    bytecode: &[u8],
    params: &str,
    signer: &LocalWallet,
    value: U256,
) -> Result<(Address, H256)> {
    let raw_args = if params.trim().is_empty() {
        vec![String::new()]
    } else {
        let (name, raw_args) = parse_call(params)?;
        if !name.is_empty() {
            return Err(ArgumentError::MalformedExpression(format!(
                "constructor parameters must not carry a method name, got '{name}'"
            ))
            .into());
        }
        raw_args
    };

    let kinds = match abi.constructor() {
        Some(constructor) => declared_kinds(constructor.inputs.iter().map(|p| &p.kind))?,
        None => Vec::new(),
    };
    let tokens = coerce_arguments(&kinds, &raw_args)?;

    let mut data = bytecode.to_vec();
    data.extend(ethers_core::abi::encode(&tokens));

    let sender = signer.address();
    let nonce = chain.pending_nonce(sender).await?;
    let address = get_contract_address(sender, nonce);

    let tx = TransactionRequest::new().data(data).value(value).nonce(nonce);
    let hash = chain.send_transaction(tx, signer).await?;
    debug!(?address, ?hash, "contract deployment broadcast");
    Ok((address, hash))
}

/// Call a contract method.
///
/// `params` is a call expression whose name selects the method from the ABI
/// (`NotFound` when absent). Constant methods go through `eth_call` and
/// return their rendered outputs; mutating methods are signed and broadcast.
pub async fn call(
    chain: &mut dyn Chain,
    abi: &Abi,
    address: Address,
    params: &str,
    signer: &LocalWallet,
    value: U256,
) -> Result<CallOutcome> {
    let (name, raw_args) = parse_call(params)?;
    let function = abi
        .function(&name)
        .map_err(|_| Error::NotFound(format!("method '{name}' in the abi document")))?;

    let kinds = declared_kinds(function.inputs.iter().map(|p| &p.kind))?;
    let tokens = coerce_arguments(&kinds, &raw_args)?;
    let data = function
        .encode_input(&tokens)
        .map_err(|e| ArgumentError::Codec(e.to_string()))?;

    let mutating = matches!(
        function.state_mutability,
        StateMutability::NonPayable | StateMutability::Payable
    );
    if mutating {
        let tx = TransactionRequest::new().to(address).data(data).value(value);
        let hash = chain.send_transaction(tx, signer).await?;
        Ok(CallOutcome::Transaction(hash))
    } else {
        let tx = TransactionRequest::new().to(address).data(data);
        let output = chain.call(&tx).await?;
        let tokens = function
            .decode_output(&output)
            .map_err(|e| ArgumentError::Codec(e.to_string()))?;
        Ok(CallOutcome::Constant(tokens.iter().map(to_text).collect()))
    }
}

/// Map the declared ABI parameter types onto the coercion vocabulary.
fn declared_kinds<'a>(params: impl Iterator<Item = &'a ParamType>) -> Result<Vec<ArgKind>> {
    params
        .map(|param| match param {
            ParamType::Array(inner) => Ok(ArgKind::Array(scalar_kind(inner)?)),
            other => Ok(ArgKind::Scalar(scalar_kind(other)?)),
        })
        .collect()
}

fn scalar_kind(param: &ParamType) -> Result<ScalarKind> {
    match param {
        ParamType::Address => Ok(ScalarKind::Address),
        ParamType::Uint(width) => Ok(ScalarKind::Uint(*width)),
        ParamType::Int(width) => Ok(ScalarKind::Int(*width)),
        ParamType::Bool => Ok(ScalarKind::Bool),
        ParamType::Bytes => Ok(ScalarKind::Bytes),
        ParamType::FixedBytes(size) => Ok(ScalarKind::FixedBytes(*size)),
        ParamType::String => Ok(ScalarKind::String),
        other => Err(ArgumentError::UnsupportedType(other.to_string()).into()),
    }
}

/// Decode a single-word uint out of call output.
pub(crate) fn decode_uint(output: &[u8]) -> Result<U256> {
    let tokens = ethers_core::abi::decode(&[ParamType::Uint(256)], output)
        .map_err(|e| ArgumentError::Codec(e.to_string()))?;
    match tokens.first() {
        Some(Token::Uint(value)) => Ok(*value),
        _ => Err(ArgumentError::Codec("expected a uint256 word".to_string()).into()),
    }
}

/// Decode a single address out of call output.
pub(crate) fn decode_address(output: &[u8]) -> Result<Address> {
    let tokens = ethers_core::abi::decode(&[ParamType::Address], output)
        .map_err(|e| ArgumentError::Codec(e.to_string()))?;
    match tokens.first() {
        Some(Token::Address(address)) => Ok(*address),
        _ => Err(ArgumentError::Codec("expected an address word".to_string()).into()),
    }
}
