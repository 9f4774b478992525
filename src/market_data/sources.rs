use anyhow::Result;

use super::Observation;

/// External authority for current prices.
///
/// Any transport, status or decoding problem is an `Err`; the orchestrator
/// does not distinguish between them.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch a point-in-time snapshot for `symbols`.
    ///
    /// Returns at most one observation per symbol. Symbols the source cannot
    /// price are left out of the result rather than reported as errors.
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<Observation>>;

    fn name(&self) -> &str;
}
