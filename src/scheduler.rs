//! Fixed-cadence background refresh.
//!
//! Runs one refresh at startup, then `refresh([])` (every known symbol) on
//! each tick. Failures are logged and the loop carries on; the next tick is
//! the only retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::config::RefreshConfig;
use crate::market_data::PriceService;

pub struct RefreshScheduler {
    service: Arc<PriceService>,
    interval: Duration,
    jitter: Duration,
    startup_symbols: Vec<String>,
    refresh_on_start: bool,
}

impl RefreshScheduler {
    pub fn new(service: Arc<PriceService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            jitter: Duration::ZERO,
            startup_symbols: Vec::new(),
            refresh_on_start: true,
        }
    }

    pub fn from_config(service: Arc<PriceService>, config: &RefreshConfig) -> Self {
        Self::new(service, config.interval)
            .with_jitter(config.jitter)
            .with_startup_symbols(config.symbols.clone())
            .with_refresh_on_start(config.on_start)
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Symbols for the startup refresh; an empty list means every stored one.
    pub fn with_startup_symbols(mut self, symbols: Vec<String>) -> Self {
        self.startup_symbols = symbols;
        self
    }

    pub fn with_refresh_on_start(mut self, enabled: bool) -> Self {
        self.refresh_on_start = enabled;
        self
    }

    /// Run one refresh cycle. Returns the number of persisted observations, or
    /// `None` if the cycle failed.
    pub async fn run_cycle(&self, reason: &str, symbols: &[String]) -> Option<usize> {
        match self.service.refresh(symbols).await {
            Ok(observations) => {
                info!(reason, count = observations.len(), "refresh cycle complete");
                Some(observations.len())
            }
            Err(err) => {
                warn!(reason, error = %err, code = err.code(), "refresh cycle failed");
                None
            }
        }
    }

    /// Loop until `shutdown` resolves. An in-flight cycle is dropped, not
    /// awaited, when shutdown fires.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if self.refresh_on_start {
            tokio::select! {
                _ = self.run_cycle("startup", &self.startup_symbols) => {}
                _ = &mut shutdown => return,
            }
        }

        loop {
            let delay = compute_next_delay(self.interval, self.jitter);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    tokio::select! {
                        _ = self.run_cycle("scheduled", &[]) => {}
                        _ = &mut shutdown => break,
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        info!("refresh scheduler stopped");
    }
}

/// `interval` plus a uniform offset in `[-jitter, +jitter]`, never below one
/// millisecond.
pub fn compute_next_delay(interval: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return interval.max(Duration::from_millis(1));
    }

    let base_ms = interval.as_millis().min(u128::from(u64::MAX)) as i128;
    let jitter_ms = jitter.as_millis().min(u128::from(u64::MAX)) as i128;
    let offset = rand::thread_rng().gen_range(-jitter_ms..=jitter_ms);

    let delay_ms = (base_ms + offset).clamp(1, i128::from(u64::MAX)) as u64;
    Duration::from_millis(delay_ms)
}
