//! Ethereum-compatible chain backend.
//!
//! Connection management is endpoint-list failover: candidates are tried in
//! order starting from the last known-good index, wrapping around once. A
//! connection that drops is re-established lazily by the next operation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    Address, Block, BlockNumber, Bytes, Transaction, TransactionReceipt, TransactionRequest, H256,
    U256,
};
use tracing::debug;

use crate::chain::Chain;
use crate::error::{ConnectionError, Error, Result};
use crate::registry::NetworkDescriptor;

pub struct EthChain {
    descriptor: NetworkDescriptor,
    endpoints: Vec<String>,
    provider: Option<Provider<Http>>,
    /// Index of the endpoint behind `provider`; failover resumes here.
    cursor: usize,
}

impl EthChain {
    pub fn new(descriptor: NetworkDescriptor) -> Self {
        let endpoints = descriptor.rpc.clone();
        EthChain {
            descriptor,
            endpoints,
            provider: None,
            cursor: 0,
        }
    }

    pub fn descriptor(&self) -> &NetworkDescriptor {
        &self.descriptor
    }

    /// Endpoint currently connected, if any.
    pub fn current_endpoint(&self) -> Option<&str> {
        self.provider
            .as_ref()
            .map(|_| self.endpoints[self.cursor].as_str())
    }

    /// Reconnect if the connection is gone, walking the endpoint list from
    /// the cursor with wrap-around. Each candidate is handshaken with a
    /// chain-id request before being accepted.
    async fn ensure_connected(&mut self) -> Result<()> {
        if self.provider.is_some() {
            return Ok(());
        }
        if self.endpoints.is_empty() {
            return Err(ConnectionError::EmptyEndpointList.into());
        }

        let count = self.endpoints.len();
        for step in 0..count {
            let index = (self.cursor + step) % count;
            let url = &self.endpoints[index];
            let provider = match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => provider,
                Err(e) => {
                    debug!(url = %url, error = %e, "endpoint url rejected");
                    continue;
                }
            };
            match provider.get_chainid().await {
                Ok(id) => {
                    debug!(url = %url, chain_id = %id, "connected");
                    self.provider = Some(provider);
                    self.cursor = index;
                    return Ok(());
                }
                Err(e) => debug!(url = %url, error = %e, "endpoint unreachable"),
            }
        }
        Err(ConnectionError::NoReachableEndpoint.into())
    }

    fn provider(&self) -> Result<&Provider<Http>> {
        self.provider
            .as_ref()
            .ok_or_else(|| ConnectionError::NoReachableEndpoint.into())
    }
}

/// Connect to one endpoint and measure the chain-id round trip.
pub async fn probe_endpoint(url: &str) -> Result<(U256, Duration)> {
    let provider = Provider::<Http>::try_from(url).map_err(|e| Error::Provider(e.to_string()))?;
    let started = Instant::now();
    let id = provider
        .get_chainid()
        .await
        .map_err(|e| Error::Provider(e.to_string()))?;
    Ok((id, started.elapsed()))
}

fn provider_err(e: impl std::fmt::Display) -> Error {
    Error::Provider(e.to_string())
}

#[async_trait]
impl Chain for EthChain {
    async fn connect(&mut self, endpoints: &[String], verify_identity: bool) -> Result<()> {
        if !endpoints.is_empty() {
            self.endpoints = endpoints.to_vec();
            self.cursor = 0;
        }
        self.disconnect();
        self.ensure_connected().await?;

        if verify_identity {
            let reported = self.chain_id().await?;
            if reported != U256::from(self.descriptor.id) {
                self.disconnect();
                return Err(ConnectionError::ChainIdentityMismatch {
                    expected: self.descriptor.id,
                    actual: reported.low_u64(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.provider.take().is_some() {
            debug!(network = %self.descriptor.name, "disconnected");
        }
    }

    async fn chain_id(&mut self) -> Result<U256> {
        self.ensure_connected().await?;
        self.provider()?.get_chainid().await.map_err(provider_err)
    }

    async fn gas_price(&mut self) -> Result<U256> {
        self.ensure_connected().await?;
        self.provider()?.get_gas_price().await.map_err(provider_err)
    }

    async fn block_number(&mut self) -> Result<u64> {
        self.ensure_connected().await?;
        let number = self
            .provider()?
            .get_block_number()
            .await
            .map_err(provider_err)?;
        Ok(number.as_u64())
    }

    async fn block_by_number(&mut self, number: u64) -> Result<Option<Block<H256>>> {
        self.ensure_connected().await?;
        self.provider()?.get_block(number).await.map_err(provider_err)
    }

    async fn block_by_hash(&mut self, hash: H256) -> Result<Option<Block<H256>>> {
        self.ensure_connected().await?;
        self.provider()?.get_block(hash).await.map_err(provider_err)
    }

    async fn transaction(&mut self, hash: H256) -> Result<Option<(Transaction, bool)>> {
        self.ensure_connected().await?;
        let found = self
            .provider()?
            .get_transaction(hash)
            .await
            .map_err(provider_err)?;
        Ok(found.map(|tx| {
            let pending = tx.block_number.is_none();
            (tx, pending)
        }))
    }

    async fn receipt(&mut self, hash: H256) -> Result<Option<TransactionReceipt>> {
        self.ensure_connected().await?;
        self.provider()?
            .get_transaction_receipt(hash)
            .await
            .map_err(provider_err)
    }

    async fn balance(&mut self, address: Address) -> Result<U256> {
        self.ensure_connected().await?;
        self.provider()?
            .get_balance(address, None)
            .await
            .map_err(provider_err)
    }

    async fn pending_nonce(&mut self, address: Address) -> Result<U256> {
        self.ensure_connected().await?;
        self.provider()?
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await
            .map_err(provider_err)
    }

    async fn code(&mut self, address: Address) -> Result<Bytes> {
        self.ensure_connected().await?;
        self.provider()?
            .get_code(address, None)
            .await
            .map_err(provider_err)
    }

    async fn call(&mut self, tx: &TransactionRequest) -> Result<Bytes> {
        self.ensure_connected().await?;
        let typed: TypedTransaction = tx.clone().into();
        self.provider()?
            .call(&typed, None)
            .await
            .map_err(provider_err)
    }

    async fn send_transaction(
        &mut self,
        tx: TransactionRequest,
        signer: &LocalWallet,
    ) -> Result<H256> {
        self.ensure_connected().await?;
        let from = signer.address();
        let mut tx = tx.from(from).chain_id(self.descriptor.id);

        if tx.nonce.is_none() {
            tx.nonce = Some(self.pending_nonce(from).await?);
        }
        if tx.gas_price.is_none() {
            tx.gas_price = Some(self.gas_price().await?);
        }
        if tx.gas.is_none() {
            let typed: TypedTransaction = tx.clone().into();
            let estimate = self
                .provider()?
                .estimate_gas(&typed, None)
                .await
                .map_err(provider_err)?;
            tx.gas = Some(estimate);
        }

        let typed: TypedTransaction = tx.into();
        let signer = signer.clone().with_chain_id(self.descriptor.id);
        let signature = signer
            .sign_transaction_sync(&typed)
            .map_err(|e| Error::Wallet(e.to_string()))?;
        let raw = typed.rlp_signed(&signature);
        let pending = self
            .provider()?
            .send_raw_transaction(raw)
            .await
            .map_err(provider_err)?;
        Ok(pending.tx_hash())
    }
}

impl Drop for EthChain {
    fn drop(&mut self) {
        self.disconnect();
    }
}
