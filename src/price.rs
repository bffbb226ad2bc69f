//! Off-chain token price client (CoinMarketCap-style quote endpoint).

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

const QUOTE_PATH: &str = "/v1/cryptocurrency/quotes/latest";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// One quote row as surfaced to the CLI.
#[derive(Debug, Clone)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub rank: Option<u64>,
    pub price: f64,
    pub market_cap: f64,
}

#[derive(Deserialize)]
struct QuoteResponse {
    status: ResponseStatus,
    #[serde(default)]
    data: HashMap<String, CoinEntry>,
}

#[derive(Deserialize)]
struct ResponseStatus {
    error_code: i64,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct CoinEntry {
    symbol: String,
    name: String,
    cmc_rank: Option<u64>,
    quote: HashMap<String, CurrencyQuote>,
}

#[derive(Deserialize)]
struct CurrencyQuote {
    price: Option<f64>,
    market_cap: Option<f64>,
}

pub struct PriceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PriceClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        PriceClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch latest quotes for a comma-separated symbol list, converted to
    /// `convert` (usually "USD").
    pub async fn quotes(&self, symbols: &str, convert: &str) -> Result<Vec<Quote>> {
        let url = format!("{}{}", self.base_url, QUOTE_PATH);
        debug!(%url, symbols, "fetching quotes");
        let response: QuoteResponse = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("symbol", symbols), ("convert", convert)])
            .send()
            .await?
            .json()
            .await?;

        if response.status.error_code != 0 {
            return Err(Error::Other(format!(
                "price service error {}: {}",
                response.status.error_code,
                response.status.error_message.unwrap_or_default()
            )));
        }

        let mut quotes = Vec::new();
        for entry in response.data.into_values() {
            let Some(currency) = entry.quote.get(convert) else {
                continue;
            };
            quotes.push(Quote {
                symbol: entry.symbol,
                name: entry.name,
                rank: entry.cmc_rank,
                price: currency.price.unwrap_or_default(),
                market_cap: currency.market_cap.unwrap_or_default(),
            });
        }
        quotes.sort_by(|a, b| a.rank.unwrap_or(u64::MAX).cmp(&b.rank.unwrap_or(u64::MAX)));
        Ok(quotes)
    }
}
