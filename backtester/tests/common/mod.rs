#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use backtester::{
    context::DecisionContext,
    oracle::{Action, Decision, DecisionOracle},
    store::TimeframeStore,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use market_data_ingestor::{
    io::series_file_name,
    models::{
        bar::{Bar, BarSeries},
        timeframe::TimeFrame,
    },
};

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// `n` bars of `tf` from `start`, close given by `close(i, ts)`.
pub fn series(
    tf: TimeFrame,
    start: DateTime<Utc>,
    n: usize,
    close: impl Fn(usize, DateTime<Utc>) -> f64,
) -> BarSeries {
    let step = tf.duration();
    BarSeries {
        symbol: "BTCUSDT".into(),
        timeframe: tf,
        bars: (0..n)
            .map(|i| {
                let ts = start + step * i as i32;
                let c = close(i, ts);
                Bar {
                    timestamp: ts,
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: 1.0,
                }
            })
            .collect(),
    }
}

fn context_series() -> (BarSeries, BarSeries) {
    let weekly = series(
        TimeFrame::week(),
        utc(2023, 10, 2, 0, 0),
        14,
        |i, _| 30_000.0 + i as f64,
    );
    let daily = series(
        TimeFrame::day(),
        utc(2023, 11, 1, 0, 0),
        70,
        |i, _| 35_000.0 + i as f64,
    );
    (weekly, daily)
}

/// 15m primary from 2024-01-01 00:00Z for three days, close `100 + i` unless overridden.
pub fn intraday_store(overrides: &[(DateTime<Utc>, f64)]) -> TimeframeStore {
    let (weekly, daily) = context_series();
    let hourly = series(
        TimeFrame::hour(),
        utc(2023, 12, 25, 0, 0),
        24 * 10,
        |i, _| 40_000.0 + i as f64,
    );
    let primary = series(TimeFrame::minutes_15(), utc(2024, 1, 1, 0, 0), 4 * 24 * 3, |i, ts| {
        overrides
            .iter()
            .find(|(t, _)| *t == ts)
            .map_or(100.0 + i as f64, |(_, px)| *px)
    });
    TimeframeStore::from_series(weekly, daily, hourly, Some(primary))
}

/// Hourly primary from 2023-12-31 00:00Z for three days, flat at `base` unless overridden.
pub fn hourly_store(base: f64, overrides: &[(DateTime<Utc>, f64)]) -> TimeframeStore {
    let (weekly, daily) = context_series();
    let hourly = series(TimeFrame::hour(), utc(2023, 12, 31, 0, 0), 24 * 3, |_, ts| {
        overrides
            .iter()
            .find(|(t, _)| *t == ts)
            .map_or(base, |(_, px)| *px)
    });
    TimeframeStore::from_series(weekly, daily, hourly, None)
}

/// Writes every series of `store` as `{SYMBOL}_{interval}.csv` under `dir`.
pub fn write_store(dir: &Path, store: &TimeframeStore) {
    use backtester::store::SeriesId;
    for id in SeriesId::ALL {
        let s = store.series(id);
        let path = dir.join(series_file_name(&s.symbol, s.timeframe));
        let mut w = csv::Writer::from_path(path).unwrap();
        w.write_record(["timestamp", "open", "high", "low", "close", "volume"]).unwrap();
        for b in &s.bars {
            w.write_record([
                b.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                b.open.to_string(),
                b.high.to_string(),
                b.low.to_string(),
                b.close.to_string(),
                b.volume.to_string(),
            ])
            .unwrap();
        }
        w.flush().unwrap();
    }
}

pub fn decision(action: Action, support: Option<f64>, resistance: Option<f64>) -> Decision {
    Decision {
        action,
        support,
        resistance,
        rationale: format!("{action:?}"),
    }
}

/// Answers from a timestamp table, hold otherwise, and gives nothing at the
/// failure times. Records every call.
#[derive(Default)]
pub struct ScriptedOracle {
    script: HashMap<DateTime<Utc>, Decision>,
    failures: HashSet<DateTime<Utc>>,
    pub calls: Mutex<Vec<(DateTime<Utc>, usize)>>,
}

impl ScriptedOracle {
    pub fn new(script: impl IntoIterator<Item = (DateTime<Utc>, Decision)>) -> Self {
        Self {
            script: script.into_iter().collect(),
            failures: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, times: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        self.failures.extend(times);
        self
    }

    pub fn call_times(&self) -> Vec<DateTime<Utc>> {
        self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, ctx: &DecisionContext<'_>, _price: f64) -> Option<Decision> {
        self.calls.lock().unwrap().push((ctx.timestamp, ctx.slices.len()));
        if self.failures.contains(&ctx.timestamp) {
            return None;
        }
        Some(
            self.script
                .get(&ctx.timestamp)
                .cloned()
                .unwrap_or_else(|| Decision::hold("nothing to do")),
        )
    }
}

/// Never answers, as if every call timed out.
pub struct FailingOracle;

#[async_trait]
impl DecisionOracle for FailingOracle {
    async fn decide(&self, _ctx: &DecisionContext<'_>, _price: f64) -> Option<Decision> {
        None
    }
}

pub fn step(start: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    start + Duration::minutes(minutes)
}
