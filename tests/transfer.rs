//! Fee accounting, batch skips, and the sweep reserve threshold against a
//! local JSON-RPC stub.

use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use evmctl::chain::transfer::{sweep, transfer_batch};
use evmctl::chain::{Chain, EthChain};
use evmctl::error::Error;
use evmctl::registry::{ChainKind, NetworkDescriptor};
use mockito::Matcher;

const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn descriptor() -> NetworkDescriptor {
    NetworkDescriptor {
        id: 31337,
        name: "stub".into(),
        currency: "ETH".into(),
        kind: ChainKind::Eth,
        is_test: true,
        rpc: vec![mockito::server_url()],
        explorer: String::new(),
    }
}

fn mock_method(method: &str, result: &str) -> mockito::Mock {
    mockito::mock("POST", "/")
        .match_body(Matcher::PartialJson(serde_json::json!({ "method": method })))
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":"{result}"}}"#
        ))
        .create()
}

#[tokio::test]
async fn fee_accounting_and_sweep_reserve() {
    let gas_price = U256::from(1_000_000_000u64); // 1 gwei
    let _chain_id = mock_method("eth_chainId", "0x7a69");
    let _gas_price = mock_method("eth_gasPrice", "0x3b9aca00");
    let _nonce = mock_method("eth_getTransactionCount", "0x0");

    let signer: LocalWallet = TEST_KEY.parse().unwrap();
    let sender = signer.address();
    let amount = U256::from(1000u64);
    let fee = gas_price * U256::from(21_000u64);

    // Two sendable recipients; the self-recipient and the zero amount are
    // no-ops and must not count toward the required balance.
    let recipients = vec![
        (Address::repeat_byte(0x11), amount),
        (sender, amount),
        (Address::repeat_byte(0x22), U256::zero()),
        (Address::repeat_byte(0x33), amount),
    ];
    let required = (amount + fee) * U256::from(2u64);

    // One wei short of the requirement fails up front.
    let balance = mock_method("eth_getBalance", &format!("{:#x}", required - U256::one()));
    let mut chain = EthChain::new(descriptor());
    chain.connect(&[], true).await.unwrap();
    match transfer_batch(&mut chain, &signer, &recipients, 21_000).await {
        Err(Error::InsufficientBalance {
            required: reported,
            available,
        }) => {
            assert_eq!(reported, required);
            assert_eq!(available, required - U256::one());
        }
        other => panic!("expected InsufficientBalance, got {:?}", other.map(|o| o.len())),
    }
    drop(balance);

    // Exactly enough goes through, and only the sendable pair is attempted.
    let balance = mock_method("eth_getBalance", &format!("{required:#x}"));
    let send = mock_method(
        "eth_sendRawTransaction",
        &format!("0x{}", "ab".repeat(32)),
    );
    let outcomes = transfer_batch(&mut chain, &signer, &recipients, 21_000)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(outcomes[0].to, Address::repeat_byte(0x11));
    assert_eq!(outcomes[1].to, Address::repeat_byte(0x33));
    drop(balance);

    // Sweep skips a source whose balance equals the fee reserve exactly.
    let reserve = gas_price * U256::from(21_000u64) * U256::from(3u64) / U256::from(2u64);
    let balance = mock_method("eth_getBalance", &format!("{reserve:#x}"));
    let sources = vec![signer.clone()];
    let target = Address::repeat_byte(0x44);
    let outcomes = sweep(&mut chain, &sources, target, 21_000, 3, 2).await.unwrap();
    assert!(outcomes.is_empty());
    drop(balance);

    // One wei above the reserve is swept, and the reserve stays behind.
    let _balance = mock_method("eth_getBalance", &format!("{:#x}", reserve + U256::one()));
    let outcomes = sweep(&mut chain, &sources, target, 21_000, 3, 2).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].amount, U256::one());
    assert!(outcomes[0].result.is_ok());

    drop(send);
}
