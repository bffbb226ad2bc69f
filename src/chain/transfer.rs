//! Native-currency transfers: batch send, sweep, and speed-up.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, TransactionRequest, H256, U256};
use tracing::{debug, warn};

use crate::chain::Chain;
use crate::error::{Error, Result};

/// Result of one attempted transfer within a batch.
pub struct TransferOutcome {
    pub to: Address,
    pub amount: U256,
    pub result: Result<H256>,
}

/// Result of draining one source wallet into the sweep target.
pub struct SweepOutcome {
    pub from: Address,
    pub amount: U256,
    pub result: Result<H256>,
}

/// Send native currency to each recipient from one sender.
///
/// Gas price and the sender's pending nonce are read once per batch; the
/// nonce is then reserved locally per attempt, advancing even when a
/// broadcast fails so later recipients keep their slots. Recipients equal to
/// the sender and zero amounts are skipped as no-ops. Before anything is
/// sent the sender's balance must cover every planned amount plus a flat
/// `transfer_gas` fee per planned transfer.
pub async fn transfer_batch(
    chain: &mut dyn Chain,
    signer: &LocalWallet,
    recipients: &[(Address, U256)],
    transfer_gas: u64,
) -> Result<Vec<TransferOutcome>> {
    let sender = signer.address();
    let gas_price = chain.gas_price().await?;
    let mut nonce = chain.pending_nonce(sender).await?;
    let balance = chain.balance(sender).await?;

    let fee = gas_price * U256::from(transfer_gas);
    let mut required = U256::zero();
    for (to, amount) in recipients {
        if *to == sender || amount.is_zero() {
            continue;
        }
        required = required + *amount + fee;
    }
    if balance < required {
        return Err(Error::InsufficientBalance {
            required,
            available: balance,
        });
    }

    let mut outcomes = Vec::with_capacity(recipients.len());
    for (to, amount) in recipients {
        if *to == sender {
            debug!(?to, "skipping transfer to self");
            continue;
        }
        if amount.is_zero() {
            debug!(?to, "skipping zero-amount transfer");
            continue;
        }
        let tx = TransactionRequest::new()
            .to(*to)
            .value(*amount)
            .gas(transfer_gas)
            .gas_price(gas_price)
            .nonce(nonce);
        let result = chain.send_transaction(tx, signer).await;
        if let Err(e) = &result {
            warn!(?to, %amount, error = %e, "transfer broadcast failed");
        }
        // The nonce slot is consumed optimistically either way.
        nonce += U256::one();
        outcomes.push(TransferOutcome {
            to: *to,
            amount: *amount,
            result,
        });
    }
    Ok(outcomes)
}

/// Drain each source wallet into `to`, leaving nothing behind.
///
/// Per source the sweep amount is the balance minus a fee reserve of
/// `gas_price × transfer_gas × margin_num / margin_den`; sources whose
/// balance does not strictly exceed the reserve are skipped. Each source
/// signs with its own key and a fresh pending nonce.
pub async fn sweep(
    chain: &mut dyn Chain,
    sources: &[LocalWallet],
    to: Address,
    transfer_gas: u64,
    margin_num: u64,
    margin_den: u64,
) -> Result<Vec<SweepOutcome>> {
    let gas_price = chain.gas_price().await?;
    let reserve =
        gas_price * U256::from(transfer_gas) * U256::from(margin_num) / U256::from(margin_den);

    let mut outcomes = Vec::new();
    for signer in sources {
        let from = signer.address();
        if from == to {
            debug!(?from, "skipping sweep target itself");
            continue;
        }
        let balance = match chain.balance(from).await {
            Ok(balance) => balance,
            Err(e) => {
                outcomes.push(SweepOutcome {
                    from,
                    amount: U256::zero(),
                    result: Err(e),
                });
                continue;
            }
        };
        if balance <= reserve {
            debug!(?from, %balance, %reserve, "balance does not cover the fee reserve");
            continue;
        }
        let amount = balance - reserve;
        let tx = TransactionRequest::new()
            .to(to)
            .value(amount)
            .gas(transfer_gas)
            .gas_price(gas_price);
        let result = chain.send_transaction(tx, signer).await;
        if let Err(e) = &result {
            warn!(?from, %amount, error = %e, "sweep broadcast failed");
        }
        outcomes.push(SweepOutcome {
            from,
            amount,
            result,
        });
    }
    Ok(outcomes)
}

/// Rebroadcast a pending transaction with a higher gas price, keeping its
/// nonce, recipient, value, and payload. The new price must be at least the
/// network's current suggestion and at least the original price.
pub async fn speed_up(
    chain: &mut dyn Chain,
    signer: &LocalWallet,
    hash: H256,
    new_gas_price: U256,
) -> Result<H256> {
    let suggested = chain.gas_price().await?;
    let (original, pending) = chain
        .transaction(hash)
        .await?
        .ok_or_else(|| Error::NotFound(format!("transaction {hash:#x}")))?;
    if !pending {
        return Err(Error::Other(format!(
            "transaction {hash:#x} is no longer pending"
        )));
    }
    if new_gas_price < suggested {
        return Err(Error::GasPriceTooLow(format!(
            "{new_gas_price} is below the suggested price {suggested}"
        )));
    }
    let original_price = original.gas_price.unwrap_or_default();
    if new_gas_price < original_price {
        return Err(Error::GasPriceTooLow(format!(
            "{new_gas_price} is below the original price {original_price}"
        )));
    }

    let mut replacement = TransactionRequest::new()
        .nonce(original.nonce)
        .value(original.value)
        .gas(original.gas)
        .gas_price(new_gas_price)
        .data(original.input.clone());
    if let Some(to) = original.to {
        replacement = replacement.to(to);
    }
    chain.send_transaction(replacement, signer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ethers::types::{
        Block, Bytes, NameOrAddress, Transaction, TransactionReceipt, H256,
    };

    /// Offline chain stub that records broadcasts and can be told to fail
    /// specific attempts.
    struct ScriptedChain {
        gas_price: U256,
        nonce: U256,
        balance: U256,
        fail_attempts: Vec<usize>,
        sent: Vec<(Address, U256, U256)>, // (to, value, nonce)
        attempts: usize,
    }

    impl ScriptedChain {
        fn new(gas_price: u64, balance: U256) -> Self {
            ScriptedChain {
                gas_price: U256::from(gas_price),
                nonce: U256::zero(),
                balance,
                fail_attempts: Vec::new(),
                sent: Vec::new(),
                attempts: 0,
            }
        }
    }

    #[async_trait]
    impl Chain for ScriptedChain {
        async fn connect(&mut self, _endpoints: &[String], _verify: bool) -> Result<()> {
            Ok(())
        }

        fn disconnect(&mut self) {}

        async fn chain_id(&mut self) -> Result<U256> {
            Ok(U256::one())
        }

        async fn gas_price(&mut self) -> Result<U256> {
            Ok(self.gas_price)
        }

        async fn block_number(&mut self) -> Result<u64> {
            Ok(0)
        }

        async fn block_by_number(&mut self, _number: u64) -> Result<Option<Block<H256>>> {
            Ok(None)
        }

        async fn block_by_hash(&mut self, _hash: H256) -> Result<Option<Block<H256>>> {
            Ok(None)
        }

        async fn transaction(&mut self, _hash: H256) -> Result<Option<(Transaction, bool)>> {
            Ok(None)
        }

        async fn receipt(&mut self, _hash: H256) -> Result<Option<TransactionReceipt>> {
            Ok(None)
        }

        async fn balance(&mut self, _address: Address) -> Result<U256> {
            Ok(self.balance)
        }

        async fn pending_nonce(&mut self, _address: Address) -> Result<U256> {
            Ok(self.nonce)
        }

        async fn code(&mut self, _address: Address) -> Result<Bytes> {
            Ok(Bytes::new())
        }

        async fn call(&mut self, _tx: &TransactionRequest) -> Result<Bytes> {
            Ok(Bytes::new())
        }

        async fn send_transaction(
            &mut self,
            tx: TransactionRequest,
            _signer: &LocalWallet,
        ) -> Result<H256> {
            let attempt = self.attempts;
            self.attempts += 1;
            let to = match tx.to {
                Some(NameOrAddress::Address(to)) => to,
                _ => Address::zero(),
            };
            self.sent
                .push((to, tx.value.unwrap_or_default(), tx.nonce.unwrap_or_default()));
            if self.fail_attempts.contains(&attempt) {
                return Err(Error::TransferFailed {
                    to: format!("{to:#x}"),
                    reason: "scripted failure".to_string(),
                });
            }
            Ok(H256::repeat_byte(attempt as u8 + 1))
        }
    }

    fn test_signer() -> LocalWallet {
        LocalWallet::new(&mut rand::thread_rng())
    }

    #[tokio::test]
    async fn nonce_slots_advance_past_failed_broadcasts() {
        let signer = test_signer();
        let recipients = vec![
            (Address::repeat_byte(0x01), U256::from(10u64)),
            (Address::repeat_byte(0x02), U256::from(10u64)),
            (Address::repeat_byte(0x03), U256::from(10u64)),
        ];
        let mut chain = ScriptedChain::new(1, U256::MAX);
        chain.fail_attempts.push(1);

        let outcomes = transfer_batch(&mut chain, &signer, &recipients, 21_000)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());

        let nonces: Vec<u64> = chain.sent.iter().map(|(_, _, n)| n.as_u64()).collect();
        assert_eq!(nonces, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn self_and_zero_recipients_are_never_broadcast() {
        let signer = test_signer();
        let recipients = vec![
            (signer.address(), U256::from(10u64)),
            (Address::repeat_byte(0x01), U256::zero()),
            (Address::repeat_byte(0x02), U256::from(10u64)),
        ];
        let mut chain = ScriptedChain::new(1, U256::MAX);

        let outcomes = transfer_batch(&mut chain, &signer, &recipients, 21_000)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(chain.sent.len(), 1);
        assert_eq!(chain.sent[0].0, Address::repeat_byte(0x02));
    }

    #[tokio::test]
    async fn sweep_leaves_the_fee_reserve_behind() {
        let signer = test_signer();
        let gas_price = 1_000u64;
        let reserve = U256::from(gas_price) * U256::from(21_000u64) * U256::from(3u64)
            / U256::from(2u64);
        let mut chain = ScriptedChain::new(gas_price, reserve + U256::from(5u64));

        let target = Address::repeat_byte(0x99);
        let outcomes = sweep(&mut chain, &[signer], target, 21_000, 3, 2)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].amount, U256::from(5u64));
        assert_eq!(chain.sent[0].0, target);
        assert_eq!(chain.sent[0].1, U256::from(5u64));
    }
}
