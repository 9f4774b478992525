#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use coinrate::market_data::{Aggregation, Observation, PriceSource, PriceStore};

pub fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn observation(symbol: &str, price: f64, minutes: i64) -> Observation {
    Observation::new(symbol, price, t(minutes)).expect("valid observation")
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Price source with a fixed price table, call recording and a failure switch.
pub struct MockPriceSource {
    prices: HashMap<String, f64>,
    observed_at: DateTime<Utc>,
    delay: Option<StdDuration>,
    fail: AtomicBool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl Default for MockPriceSource {
    fn default() -> Self {
        Self {
            prices: HashMap::new(),
            observed_at: t(60),
            delay: None,
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Sleep this long inside every fetch, after recording the call.
    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_on_fetch(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<Observation>> {
        self.calls.lock().unwrap().push(symbols.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("mock source unavailable");
        }
        let mut out = Vec::new();
        for symbol in symbols {
            if let Some(price) = self.prices.get(symbol) {
                out.push(Observation::new(symbol.clone(), *price, self.observed_at)?);
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Wraps a store and fails selected operations on demand.
pub struct FlakyStore<S> {
    inner: Arc<S>,
    fail_append: AtomicBool,
    fail_query: AtomicBool,
    fail_list: AtomicBool,
    queries: AtomicUsize,
}

impl<S: PriceStore> FlakyStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            fail_append: AtomicBool::new(false),
            fail_query: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn fail_append(&self, fail: bool) {
        self.fail_append.store(fail, Ordering::SeqCst);
    }

    pub fn fail_query(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: PriceStore> PriceStore for FlakyStore<S> {
    async fn append(&self, observations: &[Observation]) -> Result<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.append(observations).await
    }

    async fn query(&self, symbol: &str, aggregation: Aggregation) -> Result<Option<Observation>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset");
        }
        self.inner.query(symbol, aggregation).await
    }

    async fn list_known_symbols(&self) -> Result<Vec<String>> {
        if self.fail_list.load(Ordering::SeqCst) {
            anyhow::bail!("connection reset");
        }
        self.inner.list_known_symbols().await
    }
}
