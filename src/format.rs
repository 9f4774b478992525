//! Presentation helpers for prices and observation timestamps.
//!
//! These only shape what callers see; stored observations keep full precision.

use std::fmt::Write;

use anyhow::{bail, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Round a price to `dp` decimal places, half away from zero.
///
/// Values `Decimal` cannot represent (NaN, infinities) are returned as-is.
pub fn round_price(price: f64, dp: u32) -> f64 {
    let Some(value) = Decimal::from_f64(price) else {
        return price;
    };
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(price)
}

/// Reject `strftime` patterns chrono cannot render, e.g. `%Q`.
pub fn validate_date_format(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        bail!("Invalid date format: {pattern:?}");
    }
    Ok(())
}

/// Format an observation timestamp with a chrono `strftime` pattern.
///
/// An unrenderable pattern falls back to RFC 3339.
pub fn format_observed_at(observed_at: &DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", observed_at.format(pattern)).is_err() {
        return observed_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    out
}
