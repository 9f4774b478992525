mod aggregation;
mod error;
mod jsonl_store;
mod models;
pub mod providers;
mod service;
mod sources;
mod store;

pub use aggregation::{Aggregation, ParseAggregationError};
pub use error::PriceError;
pub use jsonl_store::JsonlPriceStore;
pub use models::Observation;
pub use service::PriceService;
pub use sources::PriceSource;
pub use store::{distinct_symbols, reduce, MemoryPriceStore, PriceStore};
