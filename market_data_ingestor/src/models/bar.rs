//! Canonical in-memory representation of a time-series bar (OHLCV).
//!
//! This struct is the standard output for all [`DataProvider`](crate::providers::DataProvider)
//! implementations and the CSV loader, and the only price type the backtester reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timeframe::TimeFrame;

/// A single time-series bar (OHLCV) for a given timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// The opening timestamp for this bar (UTC).
    pub timestamp: DateTime<Utc>,

    /// Opening price.
    pub open: f64,

    /// Highest price during the bar interval.
    pub high: f64,

    /// Lowest price during the bar interval.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Volume traded during the bar interval.
    pub volume: f64,
}

/// Represents a complete set of time-series data for a single symbol.
///
/// This struct groups a vector of [`Bar`]s with their corresponding symbol
/// and [`TimeFrame`], making the data set self-describing.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    /// The symbol this data represents (e.g., "BTCUSDT").
    pub symbol: String,
    /// The time interval for each bar in the series.
    pub timeframe: TimeFrame,
    /// The collection of OHLCV bars, oldest first.
    pub bars: Vec<Bar>,
}

impl BarSeries {
    /// Index of the first bar strictly after `ts`; every bar before it is at or before `ts`.
    pub fn upper_bound(&self, ts: DateTime<Utc>) -> usize {
        self.bars.partition_point(|b| b.timestamp <= ts)
    }

    /// The most recent `max_count` bars at or before `as_of`, oldest first.
    pub fn tail_at(&self, as_of: DateTime<Utc>, max_count: usize) -> &[Bar] {
        let end = self.upper_bound(as_of);
        let start = end.saturating_sub(max_count);
        &self.bars[start..end]
    }

    /// The last bar at or before `as_of`, if any.
    pub fn last_at(&self, as_of: DateTime<Utc>) -> Option<&Bar> {
        self.tail_at(as_of, 1).first()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }
}
