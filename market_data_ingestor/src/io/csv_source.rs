//! Loading OHLCV series from `timestamp,open,high,low,close,volume` CSV files.
//!
//! Accepted timestamp forms, all interpreted as UTC:
//! - RFC-3339 with offset (`2024-01-01T00:00:00Z`, `2024-01-01T08:00:00+08:00`)
//! - naive date-time (`2024-01-01 00:00:00`, `2024-01-01T00:00:00`, optional fraction)
//! - bare date (`2024-01-01`, midnight UTC)
//! - integer epoch milliseconds (`1704067200000`)

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{
    bar::{Bar, BarSeries},
    timeframe::TimeFrame,
};

/// Failure to produce a usable series from disk. Always fatal to a backtest run.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("data file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: malformed row {row}: {source}", path.display())]
    Csv {
        path: PathBuf,
        row: usize,
        source: csv::Error,
    },

    #[error("{}: row {row}: unparsable timestamp '{value}'", path.display())]
    Timestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("{}: row {row}: timestamp {timestamp} is not after the previous row", path.display())]
    Unordered {
        path: PathBuf,
        row: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("{}: series is empty", path.display())]
    Empty { path: PathBuf },
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Parses one timestamp cell in any of the accepted forms.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }
    None
}

/// Reads and validates one series file.
///
/// Rows must be strictly increasing in time; an empty file is an error, since a
/// backtest cannot run on a timeframe it has no history for.
pub fn load_series(
    path: impl AsRef<Path>,
    symbol: &str,
    timeframe: TimeFrame,
) -> Result<BarSeries, DataLoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataLoadError::Missing {
            path: path.to_path_buf(),
        });
    }
    let file = std::fs::File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut bars: Vec<Bar> = Vec::new();
    for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
        // 1-based, header is row 1
        let row = i + 2;
        let record = record.map_err(|source| DataLoadError::Csv {
            path: path.to_path_buf(),
            row,
            source,
        })?;
        let timestamp =
            parse_timestamp(&record.timestamp).ok_or_else(|| DataLoadError::Timestamp {
                path: path.to_path_buf(),
                row,
                value: record.timestamp.clone(),
            })?;
        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                return Err(DataLoadError::Unordered {
                    path: path.to_path_buf(),
                    row,
                    timestamp,
                });
            }
        }
        bars.push(Bar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    if bars.is_empty() {
        return Err(DataLoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    tracing::debug!(path = %path.display(), bars = bars.len(), %timeframe, "loaded series");
    Ok(BarSeries {
        symbol: symbol.to_string(),
        timeframe,
        bars,
    })
}

/// Conventional file name for a symbol/timeframe pair, e.g. `BTCUSDT_15m.csv`.
pub fn series_file_name(symbol: &str, timeframe: TimeFrame) -> String {
    format!("{symbol}_{timeframe}.csv")
}
