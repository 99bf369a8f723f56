//! Binance spot REST klines (`GET /api/v3/klines`). Public endpoint, no credentials.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::BinanceProvider;
