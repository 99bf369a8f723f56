//! Read-only multi-timeframe price history for one symbol.

use std::path::Path;

use chrono::{DateTime, Utc};
use market_data_ingestor::{
    io::{DataLoadError, load_series, series_file_name},
    models::{
        bar::{Bar, BarSeries},
        timeframe::TimeFrame,
    },
};
use serde::{Deserialize, Serialize};

/// The four series a decision context draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesId {
    Weekly,
    Daily,
    Hourly,
    Primary,
}

impl SeriesId {
    /// Coarsest first, the order slices appear in a context.
    pub const ALL: [SeriesId; 4] = [Self::Weekly, Self::Daily, Self::Hourly, Self::Primary];
}

#[derive(Debug, Clone)]
pub struct TimeframeStore {
    weekly: BarSeries,
    daily: BarSeries,
    hourly: BarSeries,
    /// `None` when the primary timeframe is hourly and the hourly series doubles as primary.
    primary: Option<BarSeries>,
}

impl TimeframeStore {
    /// Loads `{SYMBOL}_1w.csv`, `_1d`, `_1h` and the primary interval from `data_dir`.
    pub fn load(
        data_dir: impl AsRef<Path>,
        symbol: &str,
        primary: TimeFrame,
    ) -> Result<Self, DataLoadError> {
        let dir = data_dir.as_ref();
        let read = |tf: TimeFrame| load_series(dir.join(series_file_name(symbol, tf)), symbol, tf);

        let weekly = read(TimeFrame::week())?;
        let daily = read(TimeFrame::day())?;
        let hourly = read(TimeFrame::hour())?;
        let primary = if primary == TimeFrame::hour() {
            None
        } else {
            Some(read(primary)?)
        };
        let store = Self::from_series(weekly, daily, hourly, primary);
        tracing::info!(
            symbol,
            primary = %store.primary().timeframe,
            primary_bars = store.primary().len(),
            "loaded price history"
        );
        Ok(store)
    }

    pub fn from_series(
        weekly: BarSeries,
        daily: BarSeries,
        hourly: BarSeries,
        primary: Option<BarSeries>,
    ) -> Self {
        Self {
            weekly,
            daily,
            hourly,
            primary,
        }
    }

    pub fn series(&self, id: SeriesId) -> &BarSeries {
        match id {
            SeriesId::Weekly => &self.weekly,
            SeriesId::Daily => &self.daily,
            SeriesId::Hourly => &self.hourly,
            SeriesId::Primary => self.primary.as_ref().unwrap_or(&self.hourly),
        }
    }

    pub fn primary(&self) -> &BarSeries {
        self.series(SeriesId::Primary)
    }

    pub fn symbol(&self) -> &str {
        &self.primary().symbol
    }

    /// The most recent `max_count` bars of `id` with `timestamp <= as_of`, oldest first.
    pub fn slice(&self, id: SeriesId, as_of: DateTime<Utc>, max_count: usize) -> &[Bar] {
        self.series(id).tail_at(as_of, max_count)
    }
}
