use std::collections::HashSet;

use anyhow::Result;

use super::{Aggregation, Observation};

/// Durable, append-only log of price observations.
///
/// Reductions run inside the store so callers never pull a symbol's full
/// history into memory.
#[async_trait::async_trait]
pub trait PriceStore: Send + Sync {
    /// Append every observation, or none of them.
    async fn append(&self, observations: &[Observation]) -> Result<()>;

    /// Reduce all observations of `symbol` with `aggregation`.
    /// `Ok(None)` means nothing is stored for the symbol.
    async fn query(&self, symbol: &str, aggregation: Aggregation) -> Result<Option<Observation>>;

    /// Every symbol that has at least one observation, in first-seen order.
    async fn list_known_symbols(&self) -> Result<Vec<String>>;
}

/// Reduce the observations of one symbol.
///
/// `observations` must be in append order; ties are broken towards the later
/// entry. `Avg` carries the timestamp of the most recent observation.
pub fn reduce<'a, I>(observations: I, aggregation: Aggregation) -> Result<Option<Observation>>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut iter = observations.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };

    let mut latest = first;
    let mut min = first;
    let mut max = first;
    let mut sum = first.price();
    let mut count = 1usize;

    for obs in iter {
        if obs.observed_at() >= latest.observed_at() {
            latest = obs;
        }
        if obs.price() < min.price()
            || (obs.price() == min.price() && obs.observed_at() >= min.observed_at())
        {
            min = obs;
        }
        if obs.price() > max.price()
            || (obs.price() == max.price() && obs.observed_at() >= max.observed_at())
        {
            max = obs;
        }
        sum += obs.price();
        count += 1;
    }

    let reduced = match aggregation {
        Aggregation::Latest => latest.clone(),
        Aggregation::Min => min.clone(),
        Aggregation::Max => max.clone(),
        Aggregation::Avg => {
            Observation::new(latest.symbol(), sum / count as f64, latest.observed_at())?
        }
    };
    Ok(Some(reduced))
}

/// Distinct symbols in first-seen order.
pub fn distinct_symbols<'a, I>(observations: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut seen = HashSet::new();
    observations
        .into_iter()
        .map(Observation::symbol)
        .filter(|symbol| seen.insert(*symbol))
        .map(str::to_string)
        .collect()
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryPriceStore {
    observations: tokio::sync::RwLock<Vec<Observation>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.observations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.observations.read().await.is_empty()
    }

    /// Snapshot of everything stored, in append order.
    pub async fn all(&self) -> Vec<Observation> {
        self.observations.read().await.clone()
    }
}

#[async_trait::async_trait]
impl PriceStore for MemoryPriceStore {
    async fn append(&self, observations: &[Observation]) -> Result<()> {
        if observations.is_empty() {
            return Ok(());
        }
        let mut log = self.observations.write().await;
        log.extend_from_slice(observations);
        Ok(())
    }

    async fn query(&self, symbol: &str, aggregation: Aggregation) -> Result<Option<Observation>> {
        let log = self.observations.read().await;
        reduce(log.iter().filter(|obs| obs.symbol() == symbol), aggregation)
    }

    async fn list_known_symbols(&self) -> Result<Vec<String>> {
        let log = self.observations.read().await;
        Ok(distinct_symbols(log.iter()))
    }
}
