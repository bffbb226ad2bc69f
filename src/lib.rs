// Re-export commonly used types
pub use ethers::types::{Address, H160, H256, U256, U64};

pub mod abi;
pub mod chain;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod price;
pub mod registry;
pub mod sheet;
pub mod units;
pub mod wallet;

pub use error::{Error, Result};
