use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PriceError;

/// One recorded price for a coin at the moment it was fetched.
///
/// Built only through [`Observation::new`], so anything holding an
/// `Observation` can rely on a non-empty symbol and a non-negative price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    symbol: String,
    price: f64,
    observed_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, PriceError> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(PriceError::InvalidParameter("symbol is empty".to_string()));
        }
        if price.is_nan() || price < 0.0 {
            return Err(PriceError::InvalidParameter(format!(
                "price for {symbol} must be non-negative, got {price}"
            )));
        }
        Ok(Self {
            symbol,
            price,
            observed_at,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}
