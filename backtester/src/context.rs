//! Bounded lookback context handed to the decision oracle.

use chrono::{DateTime, Utc};
use market_data_ingestor::models::{bar::Bar, timeframe::TimeFrame};
use serde::{Deserialize, Serialize};

use crate::errors::BacktestError;
use crate::store::{SeriesId, TimeframeStore};

/// When the oracle is consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Every session-eligible primary bar.
    #[default]
    PerBar,
    /// Once per session at the opening bar; the plan holds for the rest of the session.
    SessionPlan,
}

/// How many bars of each series go into a context. `0` leaves the series out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Lookbacks {
    pub weekly: usize,
    pub daily: usize,
    pub hourly: usize,
    pub primary: usize,
}

impl Default for Lookbacks {
    fn default() -> Self {
        Self {
            weekly: 26,
            daily: 180,
            hourly: 100,
            primary: 96,
        }
    }
}

impl Lookbacks {
    pub fn get(&self, id: SeriesId) -> usize {
        match id {
            SeriesId::Weekly => self.weekly,
            SeriesId::Daily => self.daily,
            SeriesId::Hourly => self.hourly,
            SeriesId::Primary => self.primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextSlice<'a> {
    pub series: SeriesId,
    pub timeframe: TimeFrame,
    pub bars: &'a [Bar],
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionContext<'a> {
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub mode: DecisionMode,
    /// Coarsest first; series with a zero lookback are absent.
    pub slices: Vec<ContextSlice<'a>>,
}

pub struct ContextAssembler<'a> {
    store: &'a TimeframeStore,
    lookbacks: Lookbacks,
    mode: DecisionMode,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(store: &'a TimeframeStore, lookbacks: Lookbacks, mode: DecisionMode) -> Self {
        Self {
            store,
            lookbacks,
            mode,
        }
    }

    pub fn mode(&self) -> DecisionMode {
        self.mode
    }

    /// Close of the last primary bar at or before `as_of`.
    pub fn price_at(&self, as_of: DateTime<Utc>) -> Result<f64, BacktestError> {
        self.store
            .primary()
            .last_at(as_of)
            .map(|b| b.close)
            .ok_or(BacktestError::NoPrice(as_of))
    }

    /// Context and current price (see [`Self::price_at`]).
    pub fn assemble(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<(DecisionContext<'a>, f64), BacktestError> {
        let current_price = self.price_at(as_of)?;

        let slices = SeriesId::ALL
            .into_iter()
            .filter(|id| self.lookbacks.get(*id) > 0)
            .map(|id| ContextSlice {
                series: id,
                timeframe: self.store.series(id).timeframe,
                bars: self.store.slice(id, as_of, self.lookbacks.get(id)),
            })
            .collect();

        Ok((
            DecisionContext {
                timestamp: as_of,
                current_price,
                mode: self.mode,
                slices,
            },
            current_price,
        ))
    }
}
