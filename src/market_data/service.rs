use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Aggregation, Observation, PriceError, PriceSource, PriceStore};

/// Decides where prices come from: reads go to the store, refreshes pull from
/// the source and persist.
///
/// Reads never call the source. Falling back to a live fetch on a store miss
/// is the caller's job (see [`PriceService::get_or_refresh`]).
pub struct PriceService {
    store: Arc<dyn PriceStore>,
    source: Arc<dyn PriceSource>,
}

impl PriceService {
    pub fn new(store: Arc<dyn PriceStore>, source: Arc<dyn PriceSource>) -> Self {
        Self { store, source }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Reduce the stored history of each symbol, in input order.
    ///
    /// All-or-nothing: a single unresolved symbol fails the whole batch with
    /// `NotFound`.
    pub async fn get_price(
        &self,
        symbols: &[String],
        aggregation: Aggregation,
    ) -> Result<Vec<Observation>, PriceError> {
        validate_symbols(symbols)?;

        let mut prices = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let reduced = self
                .store
                .query(symbol, aggregation)
                .await
                .map_err(|e| PriceError::internal("query", e))?;
            match reduced {
                Some(obs) => prices.push(obs),
                None => {
                    debug!(symbol = %symbol, aggregation = %aggregation, "store miss");
                    return Err(PriceError::NotFound {
                        symbol: symbol.clone(),
                        aggregation,
                    });
                }
            }
        }
        Ok(prices)
    }

    pub async fn latest_price(&self, symbols: &[String]) -> Result<Vec<Observation>, PriceError> {
        self.get_price(symbols, Aggregation::Latest).await
    }

    pub async fn min_price(&self, symbols: &[String]) -> Result<Vec<Observation>, PriceError> {
        self.get_price(symbols, Aggregation::Min).await
    }

    pub async fn max_price(&self, symbols: &[String]) -> Result<Vec<Observation>, PriceError> {
        self.get_price(symbols, Aggregation::Max).await
    }

    pub async fn avg_price(&self, symbols: &[String]) -> Result<Vec<Observation>, PriceError> {
        self.get_price(symbols, Aggregation::Avg).await
    }

    /// Fetch fresh prices and persist them.
    ///
    /// An empty `symbols` means every symbol the store has seen. Returns
    /// exactly what was persisted; if the append fails nothing is returned.
    pub async fn refresh(&self, symbols: &[String]) -> Result<Vec<Observation>, PriceError> {
        let symbols = if symbols.is_empty() {
            self.store
                .list_known_symbols()
                .await
                .map_err(|e| PriceError::internal("list_known_symbols", e))?
        } else {
            validate_symbols(symbols)?;
            symbols.to_vec()
        };

        if symbols.is_empty() {
            debug!("no known symbols to refresh");
            return Ok(Vec::new());
        }

        let observations = self.source.fetch(&symbols).await.map_err(|e| {
            PriceError::UpstreamFailure {
                source_name: self.source.name().to_string(),
                operation: "fetch",
                source: e,
            }
        })?;

        if observations.len() < symbols.len() {
            warn!(
                requested = symbols.len(),
                returned = observations.len(),
                source = self.source.name(),
                "price source omitted some symbols"
            );
        }

        self.store
            .append(&observations)
            .await
            .map_err(|e| PriceError::internal("append", e))?;

        info!(
            count = observations.len(),
            source = self.source.name(),
            "refreshed prices"
        );
        Ok(observations)
    }

    /// Read from the store, falling back to a live refresh of the same
    /// symbols when any of them is missing.
    ///
    /// The refreshed observations are returned as-is (not re-aggregated). If
    /// the source had nothing for the requested symbols either, the original
    /// `NotFound` is returned.
    pub async fn get_or_refresh(
        &self,
        symbols: &[String],
        aggregation: Aggregation,
    ) -> Result<Vec<Observation>, PriceError> {
        match self.get_price(symbols, aggregation).await {
            Err(miss) if miss.is_not_found() => {
                info!(error = %miss, "falling back to live fetch");
                let fresh = self.refresh(symbols).await?;
                if fresh.is_empty() {
                    return Err(miss);
                }
                Ok(fresh)
            }
            other => other,
        }
    }
}

fn validate_symbols(symbols: &[String]) -> Result<(), PriceError> {
    if symbols.is_empty() {
        return Err(PriceError::InvalidParameter(
            "at least one symbol is required".to_string(),
        ));
    }
    if symbols.iter().any(|s| s.trim().is_empty()) {
        return Err(PriceError::InvalidParameter(
            "symbols must not be blank".to_string(),
        ));
    }
    Ok(())
}
