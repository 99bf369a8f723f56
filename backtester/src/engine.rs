//! The replay loop.
//!
//! Walks the primary series in order. For every bar inside the run's date range and
//! the session window it gets a decision (per-bar mode assembles a context and asks the
//! oracle on every bar; session-plan mode does so only at the planning bar and reads
//! the plan cache otherwise), turns the decision into an intent, applies it to the
//! account, force-closes at the session close time, and appends one equity sample.
//! Bars outside the range or the session are skipped without a sample.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{
    AccountState, EquityConvention, Intent, TradeAction, TradeLogEntry, apply, mark_to_market,
};
use crate::config::RunConfig;
use crate::context::{ContextAssembler, DecisionContext, DecisionMode};
use crate::errors::{BacktestError, ReportError};
use crate::oracle::{Action, Decision, DecisionOracle};
use crate::performance::{PerformanceReport, evaluate};
use crate::report::{EquitySample, PlanLogEntry, RunRecorder, RunSummary};
use crate::session::SessionWindow;
use crate::store::TimeframeStore;
use crate::strategy::StrategyRules;

const FORCE_CLOSE_REASON: &str = "session close";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Bars inside the date range and the session window.
    pub bars_processed: usize,
    pub oracle_calls: usize,
    pub oracle_failures: usize,
    pub long_signals: usize,
    pub short_signals: usize,
    pub hold_signals: usize,
    pub plans: usize,
    pub trades: usize,
    pub forced_closes: usize,
    pub invalid_prices: usize,
}

/// The current session's plan. Filled at the planning bar, read until the next one.
#[derive(Debug, Default)]
pub struct PlanCache {
    slot: Option<(NaiveDate, Option<Decision>)>,
}

impl PlanCache {
    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    /// `None` records that the session was planned but the oracle gave nothing.
    pub fn store(&mut self, session: NaiveDate, plan: Option<Decision>) {
        self.slot = Some((session, plan));
    }

    pub fn get(&self, session: NaiveDate) -> Option<&Decision> {
        match &self.slot {
            Some((date, plan)) if *date == session => plan.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub equity: Vec<EquitySample>,
    pub trades: Vec<TradeLogEntry>,
    pub plans: Vec<PlanLogEntry>,
    pub final_state: AccountState,
    pub stats: RunStats,
    pub performance: PerformanceReport,
}

impl BacktestOutcome {
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity.iter().map(|s| s.equity).collect()
    }
}

/// Everything the loop mutates, with every record mirrored to the recorder.
struct Ledger<'r> {
    account: AccountState,
    convention: EquityConvention,
    stats: RunStats,
    trades: Vec<TradeLogEntry>,
    plans: Vec<PlanLogEntry>,
    equity: Vec<EquitySample>,
    recorder: &'r mut dyn RunRecorder,
}

impl Ledger<'_> {
    fn last_equity(&self) -> f64 {
        self.equity.last().map_or(self.account.capital(), |s| s.equity)
    }

    fn sample(&mut self, timestamp: Option<DateTime<Utc>>, equity: f64) -> Result<(), ReportError> {
        let s = EquitySample {
            step: self.equity.len(),
            timestamp,
            equity,
        };
        self.recorder.record_equity(&s)?;
        self.equity.push(s);
        Ok(())
    }

    /// Returns `false` when the transition was rejected for a bad price.
    fn transact(
        &mut self,
        intent: Intent,
        price: f64,
        ts: DateTime<Utc>,
        rationale: &str,
    ) -> Result<bool, ReportError> {
        match apply(&self.account, intent, price, ts, rationale, self.convention) {
            Ok(t) => {
                self.account = t.state;
                if let Some(trade) = t.trade {
                    tracing::info!(
                        ts = %ts,
                        action = %trade.action,
                        price = trade.price,
                        quantity = trade.quantity,
                        "trade"
                    );
                    self.stats.trades += 1;
                    if trade.action == TradeAction::ForcedClose {
                        self.stats.forced_closes += 1;
                    }
                    self.recorder.record_trade(&trade)?;
                    self.trades.push(trade);
                }
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, ?intent, "transition rejected");
                self.stats.invalid_prices += 1;
                Ok(false)
            }
        }
    }
}

pub struct Backtester<'a> {
    symbol: String,
    store: &'a TimeframeStore,
    session: SessionWindow,
    assembler: ContextAssembler<'a>,
    rules: StrategyRules,
    convention: EquityConvention,
    initial_capital: f64,
    range: (DateTime<Utc>, DateTime<Utc>),
    annualization_factor: f64,
}

impl<'a> Backtester<'a> {
    pub fn from_config(
        config: &RunConfig,
        store: &'a TimeframeStore,
    ) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self {
            symbol: config.symbol.clone(),
            store,
            session: config.session_window()?,
            assembler: ContextAssembler::new(store, config.lookbacks, config.strategy.mode),
            rules: config.strategy_rules(),
            convention: config.strategy.equity_convention,
            initial_capital: config.initial_capital,
            range: config.date_range()?,
            annualization_factor: config.annualization_factor()?,
        })
    }

    pub fn session(&self) -> &SessionWindow {
        &self.session
    }

    pub async fn run(
        &self,
        oracle: &dyn DecisionOracle,
        recorder: &mut dyn RunRecorder,
    ) -> Result<BacktestOutcome, BacktestError> {
        let (from, until) = self.range;
        tracing::info!(
            symbol = %self.symbol,
            mode = ?self.rules.mode,
            session = %self.session.describe(),
            %from,
            %until,
            "starting backtest"
        );

        let mut ledger = Ledger {
            account: AccountState::flat(self.initial_capital),
            convention: self.convention,
            stats: RunStats::default(),
            trades: Vec::new(),
            plans: Vec::new(),
            equity: Vec::new(),
            recorder,
        };
        ledger.sample(None, self.initial_capital)?;
        let mut plans = PlanCache::default();

        for bar in &self.store.primary().bars {
            let ts = bar.timestamp;
            if ts < from || ts >= until || !self.session.is_eligible(ts) {
                continue;
            }
            ledger.stats.bars_processed += 1;

            let (decision, price) = match self.rules.mode {
                DecisionMode::PerBar => {
                    let (ctx, price) = self.assembler.assemble(ts)?;
                    (consult(oracle, &ctx, price, &mut ledger.stats).await, price)
                }
                DecisionMode::SessionPlan => {
                    let session_date = self.session.session_date(ts);
                    let price = if self.session.is_planning_bar(ts) {
                        let (ctx, price) = self.assembler.assemble(ts)?;
                        plans.invalidate();
                        let plan = consult(oracle, &ctx, price, &mut ledger.stats).await;
                        if let Some(p) = &plan {
                            tracing::info!(
                                %session_date,
                                action = ?p.action,
                                support = ?p.support,
                                resistance = ?p.resistance,
                                "session plan"
                            );
                            let entry = PlanLogEntry {
                                timestamp: ts,
                                session_date,
                                text: p.rationale.clone(),
                            };
                            ledger.stats.plans += 1;
                            ledger.recorder.record_plan(&entry)?;
                            ledger.plans.push(entry);
                        }
                        plans.store(session_date, plan);
                        price
                    } else {
                        self.assembler.price_at(ts)?
                    };
                    (plans.get(session_date).cloned(), price)
                }
            };

            let intent = self.rules.intent_for(decision.as_ref(), &ledger.account, price);
            let rationale = decision.as_ref().map_or("", |d| d.rationale.as_str());
            let mut accepted = ledger.transact(intent, price, ts, rationale)?;

            if self.session.is_close_time(ts) && !ledger.account.is_flat() {
                accepted &= ledger.transact(Intent::ForceClose, price, ts, FORCE_CLOSE_REASON)?;
            }

            let prior = ledger.last_equity();
            let equity = if accepted {
                mark_to_market(&ledger.account, price, ts, self.convention).unwrap_or_else(|e| {
                    tracing::error!(error = %e, "cannot mark position; repeating prior equity");
                    ledger.stats.invalid_prices += 1;
                    prior
                })
            } else {
                prior
            };
            tracing::debug!(ts = %ts, price, ?intent, equity, "bar");
            ledger.sample(Some(ts), equity)?;
        }

        let values: Vec<f64> = ledger.equity.iter().map(|s| s.equity).collect();
        let performance = evaluate(&values, self.annualization_factor);
        let summary = RunSummary {
            symbol: self.symbol.clone(),
            mode: self.rules.mode,
            equity_convention: self.convention,
            first_bar: ledger.equity.iter().find_map(|s| s.timestamp),
            last_bar: ledger.equity.iter().rev().find_map(|s| s.timestamp),
            initial_capital: self.initial_capital,
            final_equity: ledger.last_equity(),
            final_state: ledger.account,
            stats: ledger.stats.clone(),
            performance: performance.clone(),
        };
        ledger.recorder.finish(&summary)?;

        tracing::info!(
            bars = ledger.stats.bars_processed,
            trades = ledger.stats.trades,
            final_equity = summary.final_equity,
            ratio = ?performance.ratio,
            "backtest finished"
        );

        Ok(BacktestOutcome {
            equity: ledger.equity,
            trades: ledger.trades,
            plans: ledger.plans,
            final_state: ledger.account,
            stats: ledger.stats,
            performance,
        })
    }
}

async fn consult(
    oracle: &dyn DecisionOracle,
    ctx: &DecisionContext<'_>,
    price: f64,
    stats: &mut RunStats,
) -> Option<Decision> {
    stats.oracle_calls += 1;
    let decision = oracle.decide(ctx, price).await;
    match decision.as_ref().map(|d| d.action) {
        None => stats.oracle_failures += 1,
        Some(Action::Long) => stats.long_signals += 1,
        Some(Action::Short) => stats.short_signals += 1,
        Some(Action::Hold) => stats.hold_signals += 1,
    }
    decision
}
