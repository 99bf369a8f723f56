//! Time zone helpers for session math.
//!
//! Bars are stored in UTC; session hours, planning days and the run's date range are
//! expressed in the session's IANA zone. Local wall times only enter at the config edge
//! and must resolve to one instant under a [`DstPolicy`] or error.
//!
//! Notes:
//! - Ambiguous local times happen during "fall back" when a wall time occurs twice.
//! - Nonexistent local times happen during "spring forward" when a wall time is skipped.
//!
//! Example: New York 2024-11-03 01:30 occurs twice;
//! PreferEarliest -> 05:30Z, PreferLatest -> 06:30Z.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TzError {
    #[error("unknown time zone: {0}")]
    UnknownZone(String),
    #[error("ambiguous local time {0} in {1}")]
    Ambiguous(NaiveDateTime, Tz),
    #[error("nonexistent local time {0} in {1}")]
    Nonexistent(NaiveDateTime, Tz),
}

/// Parse an IANA zone name such as "Asia/Taipei".
pub fn parse_tz(name: &str) -> Result<Tz, TzError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TzError::UnknownZone(name.to_string()))
}

/// Policy for handling DST edge cases when converting local naive timestamps to UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Error on ambiguous (fall-back) or nonexistent (spring-forward) local times.
    Strict,
    /// For ambiguous local times, pick the earlier instant.
    #[default]
    PreferEarliest,
    /// For ambiguous local times, pick the later instant.
    PreferLatest,
    /// For nonexistent local times, step forward one minute at a time (capped at 2 hours).
    ShiftForward,
}

/// Convert a naive local timestamp to UTC using `tz` and `policy`.
///
/// - Single mapping: returned as is.
/// - Ambiguous: PreferEarliest / PreferLatest pick a side, other policies error.
/// - Nonexistent: ShiftForward nudges forward, other policies error.
pub fn from_local_naive_with_policy(
    naive: NaiveDateTime,
    tz: Tz,
    policy: DstPolicy,
) -> Result<DateTime<Utc>, TzError> {
    use chrono::offset::LocalResult::*;
    match tz.from_local_datetime(&naive) {
        Single(dt) => Ok(dt.with_timezone(&Utc)),
        Ambiguous(a, b) => match policy {
            DstPolicy::PreferEarliest => Ok(a.with_timezone(&Utc)),
            DstPolicy::PreferLatest => Ok(b.with_timezone(&Utc)),
            _ => Err(TzError::Ambiguous(naive, tz)),
        },
        None => match policy {
            DstPolicy::ShiftForward => {
                let mut t = naive;
                for _ in 0..120 {
                    t += chrono::Duration::minutes(1);
                    if let Single(dt) = tz.from_local_datetime(&t) {
                        return Ok(dt.with_timezone(&Utc));
                    }
                }
                Err(TzError::Nonexistent(naive, tz))
            }
            _ => Err(TzError::Nonexistent(naive, tz)),
        },
    }
}

/// UTC instants of local midnight at the start of `first` and the end of `last`.
///
/// The returned range is half-open: `[start, end)` covers both dates in full.
pub fn local_date_range(
    first: NaiveDate,
    last: NaiveDate,
    tz: Tz,
    policy: DstPolicy,
) -> Result<(DateTime<Utc>, DateTime<Utc>), TzError> {
    let start = from_local_naive_with_policy(first.and_time(chrono::NaiveTime::MIN), tz, policy)?;
    let after = last.succ_opt().unwrap_or(last);
    let end = from_local_naive_with_policy(after.and_time(chrono::NaiveTime::MIN), tz, policy)?;
    Ok((start, end))
}
