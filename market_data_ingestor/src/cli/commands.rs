use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::models::timeframe::TimeFrame;

use super::params::{parse_datetime, parse_timeframe};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download klines for several intervals into `{SYMBOL}_{interval}.csv` files
    Download {
        /// Exchange symbol (e.g. "BTCUSDT")
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,

        /// Start date or datetime (e.g. "2019-01-01" or "2025-01-01T09:30:00Z")
        #[arg(long, value_parser = parse_datetime, default_value = "2019-01-01")]
        start: DateTime<Utc>,

        /// End date or datetime; defaults to now
        #[arg(long, value_parser = parse_datetime)]
        end: Option<DateTime<Utc>>,

        /// Comma-separated intervals (e.g. "1w,1d,1h,15m")
        #[arg(
            long,
            value_delimiter = ',',
            value_parser = parse_timeframe,
            default_value = "1w,1d,1h,15m"
        )]
        intervals: Vec<TimeFrame>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}
