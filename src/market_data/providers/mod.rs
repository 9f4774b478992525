pub mod cryptocompare;

pub use cryptocompare::CryptoComparePriceSource;
