use coinrate::config::DisplayConfig;
use coinrate::format::{format_observed_at, round_price};
use coinrate::market_data::Observation;
use serde::{Deserialize, Serialize};

/// One row of a rate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateDto {
    pub symbol: String,
    pub price: f64,
    pub observed_at: String,
}

impl RateDto {
    pub fn from_observation(obs: &Observation, display: &DisplayConfig) -> Self {
        Self {
            symbol: obs.symbol().to_string(),
            price: round_price(obs.price(), display.price_decimals),
            observed_at: format_observed_at(&obs.observed_at(), &display.date_format),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    /// Comma-separated symbols, e.g. `BTC,ETH`.
    pub fsyms: Option<String>,
}
