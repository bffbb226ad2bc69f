use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Flat gas of a native-currency transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// Sweep fee reserve margin, as a fraction (3/2 keeps half a transfer fee of
/// headroom over the exact cost).
pub const SWEEP_MARGIN_NUM: u64 = 3;
pub const SWEEP_MARGIN_DEN: u64 = 2;

/// Runtime settings, loaded once at startup from the environment / .env file.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Path of the network registry JSON document.
    pub registry_path: PathBuf,
    /// Directory holding encrypted key files.
    pub key_dir: PathBuf,
    /// Network name used when `--network` is not given.
    pub default_network: String,

    // Transfer settings
    pub transfer_gas: u64,
    pub sweep_margin_num: u64,
    pub sweep_margin_den: u64,

    // Price service
    pub price_api_url: String,
    pub price_api_key: Option<String>,
}

impl Settings {
    /// Loads settings from environment variables, falling back to defaults
    /// under the user's home directory.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_dir = env::var("EVMCTL_HOME").map(PathBuf::from).ok().or_else(|| {
            dirs::home_dir().map(|mut path| {
                path.push(".evmctl");
                path
            })
        });
        let base_dir = base_dir.context("cannot determine a home directory; set EVMCTL_HOME")?;

        let registry_path = env::var("EVMCTL_REGISTRY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join("networks.json"));
        let key_dir = env::var("EVMCTL_KEYDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| base_dir.join("keys"));

        Ok(Settings {
            registry_path,
            key_dir,
            default_network: env::var("EVMCTL_NETWORK").unwrap_or_else(|_| "ethereum".to_string()),
            transfer_gas: env::var("EVMCTL_TRANSFER_GAS")
                .unwrap_or_else(|_| TRANSFER_GAS.to_string())
                .parse()
                .context("EVMCTL_TRANSFER_GAS must be a valid number")?,
            sweep_margin_num: env::var("EVMCTL_SWEEP_MARGIN_NUM")
                .unwrap_or_else(|_| SWEEP_MARGIN_NUM.to_string())
                .parse()
                .context("EVMCTL_SWEEP_MARGIN_NUM must be a valid number")?,
            sweep_margin_den: env::var("EVMCTL_SWEEP_MARGIN_DEN")
                .unwrap_or_else(|_| SWEEP_MARGIN_DEN.to_string())
                .parse()
                .context("EVMCTL_SWEEP_MARGIN_DEN must be a valid number")?,
            price_api_url: env::var("PRICE_API_URL")
                .unwrap_or_else(|_| "https://pro-api.coinmarketcap.com".to_string()),
            price_api_key: env::var("PRICE_API_KEY").ok(),
        })
    }
}
