//! Native-currency unit conversion.
//!
//! Amounts cross the CLI boundary as `f32` ether values. The conversion is
//! deliberately lossy in the float direction: `eth_to_wei` renders the f32
//! with the shortest decimal that round-trips and scales that decimal by
//! 10^18, so e.g. `1.234679` becomes exactly `1234679000000000000` wei.

use ethers::types::U256;
use ethers::utils::{format_units, parse_units};

/// Decimal places of the native currency.
pub const ETH_DECIMALS: u32 = 18;

/// Convert an ether amount to wei. Non-finite and non-positive inputs
/// yield zero.
pub fn eth_to_wei(eth: f32) -> U256 {
    if !eth.is_finite() || eth <= 0.0 {
        return U256::zero();
    }
    match parse_units(eth.to_string(), ETH_DECIMALS) {
        Ok(parsed) => parsed.into(),
        Err(_) => U256::zero(),
    }
}

/// Convert a wei amount to an approximate ether value for display.
pub fn wei_to_eth(wei: U256) -> f32 {
    format_units(wei, ETH_DECIMALS)
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(0.0)
}
