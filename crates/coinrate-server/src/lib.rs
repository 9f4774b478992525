//! HTTP query interface over [`coinrate::market_data::PriceService`].

mod error;
mod handlers;
mod models;
mod router;
mod state;

pub use error::ApiError;
pub use handlers::parse_symbols;
pub use models::RateDto;
pub use router::create_router;
pub use state::AppState;
