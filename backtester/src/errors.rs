use std::path::PathBuf;

use chrono::{DateTime, Utc};
use market_data_ingestor::io::DataLoadError;
use shared_utils::config::ConfigError;
use thiserror::Error;

use crate::oracle::OracleError;
use crate::tz::TzError;

/// Top-level error for a backtest run. Anything reaching the caller aborts the run.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Settings that parsed but make no sense together.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataLoadError),

    #[error(transparent)]
    Tz(#[from] TzError),

    #[error(transparent)]
    Report(#[from] ReportError),

    /// Building the oracle client failed (missing key, bad TLS setup).
    #[error("oracle setup failed: {0}")]
    OracleSetup(#[from] OracleError),

    /// The primary series has no bar at or before the decision time.
    #[error("no primary bar at or before {0}")]
    NoPrice(DateTime<Utc>),
}

/// A transition needed a price and got a non-positive or non-finite one.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid price {price} at {timestamp}")]
pub struct InvalidPriceError {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// Writing run output failed. Files flushed before the failure stay readable.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to serialise summary: {0}")]
    Json(#[from] serde_json::Error),
}
