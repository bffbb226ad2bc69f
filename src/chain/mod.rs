//! Chain backends.
//!
//! `Chain` is the capability set a network backend must provide. Ethereum-
//! compatible networks get the full `EthChain` implementation; registry
//! entries of any other kind get `UnimplementedChain`, whose operations all
//! fail loudly instead of returning empty values.

pub mod eth;
pub mod transfer;

use async_trait::async_trait;
use ethers::signers::LocalWallet;
use ethers::types::{
    Address, Block, Bytes, Transaction, TransactionReceipt, TransactionRequest, H256, U256,
};

use crate::error::{Error, Result};
use crate::registry::{ChainKind, NetworkDescriptor};

pub use eth::EthChain;

#[async_trait]
pub trait Chain: Send {
    /// Establish a connection, optionally replacing the endpoint list.
    /// With `verify_identity`, the endpoint's reported chain id must match
    /// the descriptor's.
    async fn connect(&mut self, endpoints: &[String], verify_identity: bool) -> Result<()>;

    /// Drop the connection. Idempotent.
    fn disconnect(&mut self);

    async fn chain_id(&mut self) -> Result<U256>;
    async fn gas_price(&mut self) -> Result<U256>;
    async fn block_number(&mut self) -> Result<u64>;
    async fn block_by_number(&mut self, number: u64) -> Result<Option<Block<H256>>>;
    async fn block_by_hash(&mut self, hash: H256) -> Result<Option<Block<H256>>>;
    /// Transaction by hash, with a flag marking it still pending.
    async fn transaction(&mut self, hash: H256) -> Result<Option<(Transaction, bool)>>;
    async fn receipt(&mut self, hash: H256) -> Result<Option<TransactionReceipt>>;
    async fn balance(&mut self, address: Address) -> Result<U256>;
    /// Next nonce including pending transactions.
    async fn pending_nonce(&mut self, address: Address) -> Result<U256>;
    async fn code(&mut self, address: Address) -> Result<Bytes>;

    /// Read-only contract call.
    async fn call(&mut self, tx: &TransactionRequest) -> Result<Bytes>;

    /// Sign with the given wallet and broadcast, returning the tx hash.
    /// Missing gas, gas price, and nonce fields are filled from the node.
    async fn send_transaction(
        &mut self,
        tx: TransactionRequest,
        signer: &LocalWallet,
    ) -> Result<H256>;
}

/// Backend for registry entries evmctl cannot drive.
pub struct UnimplementedChain;

#[async_trait]
impl Chain for UnimplementedChain {
    async fn connect(&mut self, _endpoints: &[String], _verify_identity: bool) -> Result<()> {
        Err(Error::NotImplemented)
    }

    fn disconnect(&mut self) {}

    async fn chain_id(&mut self) -> Result<U256> {
        Err(Error::NotImplemented)
    }

    async fn gas_price(&mut self) -> Result<U256> {
        Err(Error::NotImplemented)
    }

    async fn block_number(&mut self) -> Result<u64> {
        Err(Error::NotImplemented)
    }

    async fn block_by_number(&mut self, _number: u64) -> Result<Option<Block<H256>>> {
        Err(Error::NotImplemented)
    }

    async fn block_by_hash(&mut self, _hash: H256) -> Result<Option<Block<H256>>> {
        Err(Error::NotImplemented)
    }

    async fn transaction(&mut self, _hash: H256) -> Result<Option<(Transaction, bool)>> {
        Err(Error::NotImplemented)
    }

    async fn receipt(&mut self, _hash: H256) -> Result<Option<TransactionReceipt>> {
        Err(Error::NotImplemented)
    }

    async fn balance(&mut self, _address: Address) -> Result<U256> {
        Err(Error::NotImplemented)
    }

    async fn pending_nonce(&mut self, _address: Address) -> Result<U256> {
        Err(Error::NotImplemented)
    }

    async fn code(&mut self, _address: Address) -> Result<Bytes> {
        Err(Error::NotImplemented)
    }

    async fn call(&mut self, _tx: &TransactionRequest) -> Result<Bytes> {
        Err(Error::NotImplemented)
    }

    async fn send_transaction(
        &mut self,
        _tx: TransactionRequest,
        _signer: &LocalWallet,
    ) -> Result<H256> {
        Err(Error::NotImplemented)
    }
}

/// Build the backend matching a descriptor's kind.
pub fn new_chain(descriptor: NetworkDescriptor) -> Box<dyn Chain> {
    match descriptor.kind {
        ChainKind::Eth => Box::new(EthChain::new(descriptor)),
        ChainKind::Unsupported => Box::new(UnimplementedChain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unimplemented_chain_fails_every_operation() {
        let mut chain = UnimplementedChain;
        assert!(matches!(
            chain.connect(&[], false).await,
            Err(Error::NotImplemented)
        ));
        assert!(matches!(chain.gas_price().await, Err(Error::NotImplemented)));
        assert!(matches!(
            chain.balance(Address::zero()).await,
            Err(Error::NotImplemented)
        ));
    }
}
