//! Trading-session window in a local time zone.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::errors::BacktestError;

/// Hours `[start, end)` in `tz`, wrapping past midnight when `start > end`.
/// `start == end` is a full 24-hour session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWindow {
    start_hour: u32,
    end_hour: u32,
    tz: Tz,
    close_time: Option<NaiveTime>,
}

impl SessionWindow {
    pub fn new(start_hour: u32, end_hour: u32, tz: Tz) -> Result<Self, BacktestError> {
        if start_hour > 23 || end_hour > 23 {
            return Err(BacktestError::Config(format!(
                "session hours must be 0..=23, got {start_hour}..{end_hour}"
            )));
        }
        Ok(Self {
            start_hour,
            end_hour,
            tz,
            close_time: None,
        })
    }

    /// Sets the local wall time at which open positions are force-closed.
    pub fn with_close_time(mut self, close: NaiveTime) -> Result<Self, BacktestError> {
        if !self.contains_hour(close.hour()) {
            return Err(BacktestError::Config(format!(
                "close time {} lies outside the session",
                close.format("%H:%M")
            )));
        }
        self.close_time = Some(close);
        Ok(self)
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn close_time(&self) -> Option<NaiveTime> {
        self.close_time
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start_hour > self.end_hour
    }

    pub fn local(&self, ts: DateTime<Utc>) -> DateTime<Tz> {
        ts.with_timezone(&self.tz)
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        use std::cmp::Ordering::*;
        match self.start_hour.cmp(&self.end_hour) {
            Less => self.start_hour <= hour && hour < self.end_hour,
            Greater => hour >= self.start_hour || hour < self.end_hour,
            Equal => true,
        }
    }

    /// Whether `ts` falls inside the session. Only the local hour is compared.
    pub fn is_eligible(&self, ts: DateTime<Utc>) -> bool {
        self.contains_hour(self.local(ts).hour())
    }

    /// The bar that opens the session (`hour == start`, minute 0).
    pub fn is_planning_bar(&self, ts: DateTime<Utc>) -> bool {
        let local = self.local(ts);
        local.hour() == self.start_hour && local.minute() == 0
    }

    pub fn is_close_time(&self, ts: DateTime<Utc>) -> bool {
        let local = self.local(ts);
        self.close_time
            .is_some_and(|c| local.hour() == c.hour() && local.minute() == c.minute())
    }

    /// The local date the session containing `ts` opened on.
    ///
    /// For a session wrapping midnight or lasting all day, the hours before the
    /// start hour belong to the previous day's session.
    pub fn session_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        let local = self.local(ts);
        let date = local.date_naive();
        if self.start_hour >= self.end_hour && local.hour() < self.start_hour {
            date - Duration::days(1)
        } else {
            date
        }
    }

    pub fn hours(&self) -> u32 {
        if self.start_hour == self.end_hour {
            24
        } else {
            (self.end_hour + 24 - self.start_hour) % 24
        }
    }

    /// "Asia/Taipei 20:00-05:00" style label for prompts and logs.
    pub fn describe(&self) -> String {
        format!("{} {:02}:00-{:02}:00", self.tz, self.start_hour, self.end_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tz::parse_tz;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn taipei(start: u32, end: u32) -> SessionWindow {
        SessionWindow::new(start, end, parse_tz("Asia/Taipei").unwrap()).unwrap()
    }

    /// UTC instant for a Taipei wall-clock hour on 2024-01-10.
    fn at_local(hour: u32, minute: u32) -> DateTime<Utc> {
        parse_tz("Asia/Taipei")
            .unwrap()
            .with_ymd_and_hms(2024, 1, 10, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn overnight_session_boundaries() {
        let s = taipei(20, 5);
        assert!(!s.is_eligible(at_local(19, 45)));
        assert!(s.is_eligible(at_local(20, 0)));
        assert!(s.is_eligible(at_local(4, 45)));
        assert!(!s.is_eligible(at_local(5, 0)));
        assert_eq!(s.hours(), 9);
    }

    #[test]
    fn daytime_session_is_half_open() {
        let s = taipei(6, 21);
        assert!(!s.is_eligible(at_local(5, 59)));
        assert!(s.is_eligible(at_local(6, 0)));
        assert!(s.is_eligible(at_local(20, 45)));
        assert!(!s.is_eligible(at_local(21, 0)));
        assert_eq!(s.hours(), 15);
    }

    #[test]
    fn equal_hours_mean_all_day() {
        let s = taipei(0, 0);
        assert!((0..24).all(|h| s.contains_hour(h)));
        assert_eq!(s.hours(), 24);
    }

    #[test]
    fn planning_and_close_bars() {
        let s = taipei(6, 21)
            .with_close_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap())
            .unwrap();
        assert!(s.is_planning_bar(at_local(6, 0)));
        assert!(!s.is_planning_bar(at_local(6, 15)));
        assert!(s.is_close_time(at_local(20, 0)));
        assert!(!s.is_close_time(at_local(20, 15)));
        assert!(!taipei(6, 21).is_close_time(at_local(20, 0)));
    }

    #[test]
    fn close_time_outside_session_is_rejected() {
        let err = taipei(6, 21).with_close_time(NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        assert!(matches!(err, Err(BacktestError::Config(_))));
    }

    #[test]
    fn overnight_bars_share_the_opening_date() {
        let s = taipei(20, 5);
        let evening = at_local(22, 0);
        let next_morning = at_local(23, 0) + Duration::hours(4);
        assert_eq!(s.session_date(evening), s.session_date(next_morning));
    }

    #[test]
    fn full_day_session_runs_from_start_hour_to_start_hour() {
        let s = taipei(6, 6);
        let opening = at_local(6, 0);
        let after_midnight = at_local(23, 0) + Duration::hours(2);
        let last_hour = at_local(23, 0) + Duration::hours(6) + Duration::minutes(45);
        assert_eq!(s.session_date(after_midnight), s.session_date(opening));
        assert_eq!(s.session_date(last_hour), s.session_date(opening));
        assert_ne!(s.session_date(opening + Duration::days(1)), s.session_date(opening));
    }

    #[test]
    fn rejects_out_of_range_hours() {
        assert!(SessionWindow::new(24, 5, chrono_tz::Asia::Taipei).is_err());
    }

    proptest! {
        #[test]
        fn eligibility_matches_hour_rule(start in 0u32..24, end in 0u32..24, hour in 0u32..24) {
            let s = taipei(start, end);
            let expected = if start < end {
                start <= hour && hour < end
            } else if start > end {
                hour >= start || hour < end
            } else {
                true
            };
            prop_assert_eq!(s.contains_hour(hour), expected);
        }

        #[test]
        fn session_length_counts_eligible_hours(start in 0u32..24, end in 0u32..24) {
            let s = taipei(start, end);
            let n = (0..24).filter(|h| s.contains_hour(*h)).count() as u32;
            prop_assert_eq!(s.hours(), n);
        }
    }
}
