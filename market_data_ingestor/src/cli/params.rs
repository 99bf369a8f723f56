use chrono::{DateTime, Utc};

use crate::io::parse_timestamp;
use crate::models::timeframe::TimeFrame;

/// clap value parser for dates and datetimes; bare dates mean midnight UTC.
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("unrecognised date/time: {raw:?}"))
}

/// clap value parser for interval notation ("15m", "1h", "1d", "1w").
pub fn parse_timeframe(raw: &str) -> Result<TimeFrame, String> {
    raw.parse::<TimeFrame>().map_err(|e| e.to_string())
}
