use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timeframe::TimeFrame;

/// Universal parameters for requesting time-series bar data from any market data provider.
///
/// It is the standard input for all
/// [`DataProvider`](crate::providers::DataProvider) implementations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BarsRequestParams {
    /// Exchange symbol to request (e.g. `"BTCUSDT"`).
    pub symbol: String,

    /// The time interval for each bar (e.g., 15 minutes, 1 day).
    ///
    /// **Validation of allowed values is performed by each data provider
    /// implementation, according to their own API rules.**
    pub timeframe: TimeFrame,

    /// Start of the requested time range (inclusive, UTC).
    pub start: DateTime<Utc>,

    /// End of the requested time range (inclusive, UTC).
    pub end: DateTime<Utc>,
}
