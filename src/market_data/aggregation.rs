use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a read reduces every stored observation of a symbol to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Observation with the most recent `observed_at`.
    #[default]
    Latest,
    /// Observation holding the lowest price.
    Min,
    /// Observation holding the highest price.
    Max,
    /// Arithmetic mean of all prices.
    Avg,
}

impl Aggregation {
    pub const ALL: [Aggregation; 4] = [
        Aggregation::Latest,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::Avg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Latest => "latest",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Avg => "avg",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown aggregation {0:?} (expected latest, min, max or avg)")]
pub struct ParseAggregationError(String);

impl FromStr for Aggregation {
    type Err = ParseAggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "last" | "current" => Ok(Aggregation::Latest),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "avg" | "mean" => Ok(Aggregation::Avg),
            _ => Err(ParseAggregationError(s.to_string())),
        }
    }
}
