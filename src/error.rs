//! Error taxonomy for evmctl.
//!
//! Library code returns these typed errors; the CLI boundary wraps them with
//! `anyhow` for display.

use ethers::types::U256;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("connection: {0}")]
    Connection(#[from] ConnectionError),

    #[error("argument: {0}")]
    Argument(#[from] ArgumentError),

    #[error("signature mismatch: {0}")]
    SignatureMismatch(#[from] SignatureError),

    #[error("insufficient balance: need {required} wei, have {available} wei")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("gas price too low: {0}")]
    GasPriceTooLow(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transfer to {to} failed: {reason}")]
    TransferFailed { to: String, reason: String },

    #[error("operation is not implemented for this chain kind")]
    NotImplemented,

    #[error("registry: {0}")]
    Registry(String),

    #[error("wallet: {0}")]
    Wallet(String),

    #[error("provider: {0}")]
    Provider(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures while establishing or verifying an RPC connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("the rpc endpoint list is empty")]
    EmptyEndpointList,

    #[error("no reachable rpc endpoint")]
    NoReachableEndpoint,

    #[error("chain identity mismatch: expected chain id {expected}, endpoint reports {actual}")]
    ChainIdentityMismatch { expected: u64, actual: u64 },
}

/// Failures while parsing or coercing call arguments.
#[derive(Error, Debug)]
pub enum ArgumentError {
    #[error("malformed call expression '{0}'")]
    MalformedExpression(String),

    #[error("invalid integer literal '{0}'")]
    InvalidInteger(String),

    #[error("'{0}' does not fit in {1}")]
    IntegerOverflow(String, String),

    #[error("invalid 256-bit integer '{0}'")]
    InvalidBigInt(String),

    #[error("invalid boolean literal '{0}'")]
    InvalidBool(String),

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("invalid hex data '{0}'")]
    InvalidHex(String),

    #[error("expected a '['-delimited array, got '{0}'")]
    ExpectedArray(String),

    #[error("array argument is not terminated")]
    UnterminatedArray,

    #[error("unsupported argument type '{0}'")]
    UnsupportedType(String),

    #[error("not enough parameters: expected {expected}, got {got}")]
    NotEnoughParameters { expected: usize, got: usize },

    #[error("abi codec: {0}")]
    Codec(String),
}

/// Disagreements between a declared signature and the call or data at hand.
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("call name '{called}' does not match signature name '{declared}'")]
    NameMismatch { declared: String, called: String },

    #[error("signature expects selector 0x{expected}, data carries 0x{found}")]
    SelectorMismatch { expected: String, found: String },
}
