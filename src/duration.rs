//! Human-readable durations for config and CLI flags ("1m", "10s", "2h").

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{de, Deserialize, Deserializer};

/// Unit suffixes, longest first so "ms" wins over "s".
const UNITS: &[(&str, u64)] = &[
    ("ms", 1),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
];

/// Parse a duration such as `"1m"`, `"30s"`, `"250ms"`, `"1d"`.
///
/// Case-insensitive, surrounding whitespace ignored. The number must be a
/// non-negative integer.
///
/// ```
/// use coinrate::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let Some((num, millis_per_unit)) = UNITS
        .iter()
        .find_map(|(suffix, factor)| s.strip_suffix(suffix).map(|num| (num, *factor)))
    else {
        bail!("Duration must end with ms, s, m, h, or d: {s:?}");
    };

    let num: u64 = num
        .parse()
        .with_context(|| format!("Invalid number in duration: {s:?}"))?;
    let millis = num
        .checked_mul(millis_per_unit)
        .context("Duration is too large")?;

    Ok(Duration::from_millis(millis))
}

/// Render a duration with the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    for (suffix, factor) in [("d", 86_400_000u128), ("h", 3_600_000), ("m", 60_000), ("s", 1000)] {
        if millis >= factor && millis % factor == 0 {
            return format!("{}{suffix}", millis / factor);
        }
    }
    if millis == 0 {
        return "0s".to_string();
    }
    format!("{millis}ms")
}

/// Serde adapter: `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}
