//! CryptoCompare spot price source.
//!
//! Uses the `pricemulti` endpoint, which prices several symbols in one call.
//! Docs: https://min-api.cryptocompare.com/

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::market_data::{Observation, PriceSource};

pub const CRYPTOCOMPARE_API_BASE: &str = "https://min-api.cryptocompare.com";

/// Either a price table or CryptoCompare's error envelope, which comes back
/// with HTTP 200.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceMultiResponse {
    Error {
        #[serde(rename = "Response")]
        response: String,
        #[serde(rename = "Message")]
        message: Option<String>,
    },
    Prices(HashMap<String, HashMap<String, f64>>),
}

pub struct CryptoComparePriceSource {
    client: Client,
    base_url: String,
    quote_currency: String,
    api_key: Option<SecretString>,
    /// Our symbol -> CryptoCompare symbol.
    symbol_map: HashMap<String, String>,
    clock: Arc<dyn Clock>,
}

impl CryptoComparePriceSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: CRYPTOCOMPARE_API_BASE.to_string(),
            quote_currency: "USD".to_string(),
            api_key: None,
            symbol_map: HashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_quote_currency(mut self, currency: impl Into<String>) -> Self {
        self.quote_currency = currency.into().to_uppercase();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_symbol_map(mut self, symbol_map: HashMap<String, String>) -> Self {
        self.symbol_map = symbol_map;
        self
    }

    /// Bound every request; a timed-out call surfaces as a fetch error.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(self)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn remote_symbol<'a>(&'a self, symbol: &'a str) -> &'a str {
        self.symbol_map
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(symbol)
    }

    async fn fetch_price_table(
        &self,
        remote_symbols: &[&str],
    ) -> Result<HashMap<String, HashMap<String, f64>>> {
        let url = format!("{}/data/pricemulti", self.base_url);
        let fsyms = remote_symbols.join(",");

        let mut request = self
            .client
            .get(&url)
            .query(&[("fsyms", fsyms.as_str()), ("tsyms", self.quote_currency.as_str())])
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Apikey {}", key.expose_secret()));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("CryptoCompare request failed for {fsyms}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("CryptoCompare API error: {status} - {body}"));
        }

        let parsed: PriceMultiResponse = response
            .json()
            .await
            .context("Failed to parse CryptoCompare response")?;

        match parsed {
            PriceMultiResponse::Prices(table) => Ok(table),
            PriceMultiResponse::Error { response, message } => Err(anyhow!(
                "CryptoCompare API error ({response}): {}",
                message.unwrap_or_else(|| "unknown error".to_string())
            )),
        }
    }
}

impl Default for CryptoComparePriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PriceSource for CryptoComparePriceSource {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<Observation>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let remote: Vec<&str> = symbols.iter().map(|s| self.remote_symbol(s)).collect();
        let table = self.fetch_price_table(&remote).await?;
        let observed_at = self.clock.now();

        let mut observations = Vec::with_capacity(symbols.len());
        for (symbol, remote_symbol) in symbols.iter().zip(&remote) {
            let Some(price) = table
                .get(*remote_symbol)
                .and_then(|quotes| quotes.get(&self.quote_currency))
            else {
                debug!(symbol = %symbol, "no CryptoCompare price");
                continue;
            };
            let obs = Observation::new(symbol.clone(), *price, observed_at)
                .with_context(|| format!("CryptoCompare returned an unusable price for {symbol}"))?;
            observations.push(obs);
        }

        Ok(observations)
    }

    fn name(&self) -> &str {
        "cryptocompare"
    }
}
