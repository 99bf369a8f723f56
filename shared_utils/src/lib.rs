//! Small helpers shared by the ingestor and backtester binaries.

pub mod config;
pub mod env;
