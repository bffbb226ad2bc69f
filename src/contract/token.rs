//! ERC-20 and ERC-721 helpers built on the selector+pack path.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionRequest, H256, U256};
use ethers_core::abi::Token;
use tracing::debug;

use crate::abi::encode_call;
use crate::chain::Chain;
use crate::contract::{decode_address, decode_uint};
use crate::error::{Error, Result};

async fn read(chain: &mut dyn Chain, contract: Address, data: Vec<u8>) -> Result<Vec<u8>> {
    let tx = TransactionRequest::new().to(contract).data(data);
    Ok(chain.call(&tx).await?.to_vec())
}

async fn write(
    chain: &mut dyn Chain,
    signer: &LocalWallet,
    contract: Address,
    data: Vec<u8>,
) -> Result<H256> {
    let tx = TransactionRequest::new().to(contract).data(data);
    chain.send_transaction(tx, signer).await
}

pub async fn erc20_balance_of(
    chain: &mut dyn Chain,
    contract: Address,
    owner: Address,
) -> Result<U256> {
    let data = encode_call("balanceOf(address)", &[Token::Address(owner)]);
    decode_uint(&read(chain, contract, data).await?)
}

pub async fn erc20_allowance(
    chain: &mut dyn Chain,
    contract: Address,
    owner: Address,
    spender: Address,
) -> Result<U256> {
    let data = encode_call(
        "allowance(address,address)",
        &[Token::Address(owner), Token::Address(spender)],
    );
    decode_uint(&read(chain, contract, data).await?)
}

pub async fn erc20_transfer(
    chain: &mut dyn Chain,
    signer: &LocalWallet,
    contract: Address,
    to: Address,
    amount: U256,
) -> Result<H256> {
    let data = encode_call(
        "transfer(address,uint256)",
        &[Token::Address(to), Token::Uint(amount)],
    );
    write(chain, signer, contract, data).await
}

pub async fn erc20_approve(
    chain: &mut dyn Chain,
    signer: &LocalWallet,
    contract: Address,
    spender: Address,
    amount: U256,
) -> Result<H256> {
    let data = encode_call(
        "approve(address,uint256)",
        &[Token::Address(spender), Token::Uint(amount)],
    );
    write(chain, signer, contract, data).await
}

pub async fn erc721_balance_of(
    chain: &mut dyn Chain,
    contract: Address,
    owner: Address,
) -> Result<U256> {
    let data = encode_call("balanceOf(address)", &[Token::Address(owner)]);
    decode_uint(&read(chain, contract, data).await?)
}

pub async fn erc721_owner_of(
    chain: &mut dyn Chain,
    contract: Address,
    token_id: U256,
) -> Result<Address> {
    let data = encode_call("ownerOf(uint256)", &[Token::Uint(token_id)]);
    decode_address(&read(chain, contract, data).await?)
}

pub async fn erc721_get_approved(
    chain: &mut dyn Chain,
    contract: Address,
    token_id: U256,
) -> Result<Address> {
    let data = encode_call("getApproved(uint256)", &[Token::Uint(token_id)]);
    decode_address(&read(chain, contract, data).await?)
}

pub async fn erc721_approve(
    chain: &mut dyn Chain,
    signer: &LocalWallet,
    contract: Address,
    to: Address,
    token_id: U256,
) -> Result<H256> {
    let data = encode_call(
        "approve(address,uint256)",
        &[Token::Address(to), Token::Uint(token_id)],
    );
    write(chain, signer, contract, data).await
}

/// Transfer an ERC-721 token after checking the signer may move it: it must
/// either own the token or be its approved operator.
pub async fn erc721_transfer(
    chain: &mut dyn Chain,
    signer: &LocalWallet,
    contract: Address,
    to: Address,
    token_id: U256,
) -> Result<H256> {
    let holder = signer.address();
    let owner = erc721_owner_of(chain, contract, token_id).await?;
    if owner != holder {
        let approved = erc721_get_approved(chain, contract, token_id).await?;
        if approved != holder {
            return Err(Error::TransferFailed {
                to: format!("{to:#x}"),
                reason: format!("token {token_id} is owned by {owner:#x} and not approved"),
            });
        }
        debug!(%token_id, "transferring as approved operator");
    }
    let data = encode_call(
        "transferFrom(address,address,uint256)",
        &[
            Token::Address(owner),
            Token::Address(to),
            Token::Uint(token_id),
        ],
    );
    write(chain, signer, contract, data).await
}
