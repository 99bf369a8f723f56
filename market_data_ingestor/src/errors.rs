use thiserror::Error;

use crate::io::{DataLoadError, SinkError};
use crate::models::timeframe::TimeFrameError;
use crate::providers::{ProviderError, ProviderInitError};

/// The unified error type for the `market_data_ingestor` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A provider could not be constructed.
    #[error("Provider init error: {0}")]
    ProviderInit(#[from] ProviderInitError),

    /// An error originating from a data provider (e.g., API error, validation).
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// An error originating from a data sink (e.g., file I/O).
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// A stored series could not be read back.
    #[error("Load error: {0}")]
    Load(#[from] DataLoadError),

    /// A malformed timeframe.
    #[error("Timeframe error: {0}")]
    TimeFrame(#[from] TimeFrameError),

    /// An error related to request configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
