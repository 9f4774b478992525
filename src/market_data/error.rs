use super::Aggregation;

/// Failure kinds surfaced by [`PriceService`](super::PriceService).
///
/// Only `NotFound` is meant to be reacted to (by falling back to a live
/// refresh); the rest are reported as-is.
#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no {aggregation} price stored for {symbol}")]
    NotFound {
        symbol: String,
        aggregation: Aggregation,
    },

    #[error("price source {source_name} failed during {operation}")]
    UpstreamFailure {
        source_name: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("price store failed during {operation}")]
    InternalFailure {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl PriceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PriceError::NotFound { .. })
    }

    /// Stable machine-readable code for logs and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PriceError::InvalidParameter(_) => "INVALID_PARAMETER",
            PriceError::NotFound { .. } => "NOT_FOUND",
            PriceError::UpstreamFailure { .. } => "UPSTREAM_FAILURE",
            PriceError::InternalFailure { .. } => "INTERNAL_FAILURE",
        }
    }

    pub(crate) fn internal(operation: &'static str, source: anyhow::Error) -> Self {
        PriceError::InternalFailure { operation, source }
    }
}
