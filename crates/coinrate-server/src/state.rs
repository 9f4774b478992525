use std::sync::Arc;

use coinrate::config::DisplayConfig;
use coinrate::market_data::PriceService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PriceService>,
    pub display: Arc<DisplayConfig>,
}

impl AppState {
    pub fn new(service: Arc<PriceService>, display: DisplayConfig) -> Self {
        Self {
            service,
            display: Arc::new(display),
        }
    }
}
