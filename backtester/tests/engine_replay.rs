mod common;

use backtester::{
    Backtester, RunConfig,
    account::TradeAction,
    context::DecisionMode,
    oracle::{Action, HoldOracle},
    report::{DiscardRecorder, EQUITY_CURVE, FileRecorder, SUMMARY, TRADING_LOG},
    store::TimeframeStore,
};
use chrono::NaiveDate;
use common::*;
use market_data_ingestor::models::timeframe::TimeFrame;

fn two_days(mut config: RunConfig) -> RunConfig {
    config.start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    config.end_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    config
}

fn intraday() -> RunConfig {
    two_days(RunConfig::intraday_15m())
}

fn asia() -> RunConfig {
    two_days(RunConfig::asia_session())
}

// Taipei 20:00-05:00 is 12:00-21:00 UTC; the run covers local Jan 1-2, which ends
// at 2024-01-02 16:00Z. That leaves 36 bars on Jan 1 and 16 on Jan 2.
const INTRADAY_BARS: usize = 52;

#[tokio::test]
async fn all_hold_keeps_equity_flat() {
    let store = intraday_store(&[]);
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&HoldOracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.bars_processed, INTRADAY_BARS);
    assert_eq!(out.equity.len(), INTRADAY_BARS + 1);
    assert!(out.equity_values().iter().all(|e| *e == 10_000.0));
    assert!(out.trades.is_empty());
    assert_eq!(out.performance.ratio, None);
    assert_eq!(out.performance.total_return, 0.0);
    assert!(out.equity[0].timestamp.is_none());
    assert_eq!(out.equity[1].timestamp, Some(utc(2024, 1, 1, 12, 0)));
}

#[tokio::test]
async fn only_session_bars_reach_the_oracle() {
    let store = intraday_store(&[]);
    let oracle = ScriptedOracle::default();
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    let times = oracle.call_times();
    assert_eq!(times.len(), INTRADAY_BARS);
    assert_eq!(out.stats.oracle_calls, INTRADAY_BARS);
    assert_eq!(out.stats.hold_signals, INTRADAY_BARS);
    assert_eq!(times.first(), Some(&utc(2024, 1, 1, 12, 0)));
    assert_eq!(times.last(), Some(&utc(2024, 1, 2, 15, 45)));
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert!(times.iter().all(|t| engine.session().is_eligible(*t)));
    // weekly, daily, hourly and primary slices
    assert!(oracle.calls.lock().unwrap().iter().all(|(_, n)| *n == 4));
}

#[tokio::test]
async fn per_bar_long_then_exit() {
    // primary close is 100 + bar index; 12:00Z on Jan 1 is index 48
    let store = intraday_store(&[]);
    let oracle = ScriptedOracle::new([
        (utc(2024, 1, 1, 12, 0), decision(Action::Long, None, None)),
        (utc(2024, 1, 1, 13, 0), decision(Action::Long, None, None)),
        (utc(2024, 1, 1, 14, 0), decision(Action::Short, None, None)),
        (utc(2024, 1, 1, 15, 0), decision(Action::Short, None, None)),
    ]);
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    let actions: Vec<_> = out.trades.iter().map(|t| t.action).collect();
    assert_eq!(actions, [TradeAction::EnterLong, TradeAction::Exit]);
    assert_eq!(out.trades[0].price, 148.0);
    assert_eq!(out.trades[1].price, 156.0);
    assert_eq!(out.stats.long_signals, 2);
    assert_eq!(out.stats.short_signals, 2);

    let qty = 10_000.0 / 148.0;
    let equity = out.equity_values();
    assert_eq!(equity[1], 10_000.0);
    assert_eq!(equity[2], qty * 149.0);
    let final_equity = qty * 156.0;
    assert_eq!(out.final_state.capital(), final_equity);
    assert!(out.final_state.is_flat());
    assert_eq!(*equity.last().unwrap(), final_equity);
    assert!(out.performance.total_return > 0.0);
}

#[tokio::test]
async fn oracle_failure_changes_nothing_but_still_samples() {
    let store = intraday_store(&[]);
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&FailingOracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.oracle_calls, INTRADAY_BARS);
    assert_eq!(out.stats.oracle_failures, INTRADAY_BARS);
    assert!(out.trades.is_empty());
    assert_eq!(out.equity.len(), INTRADAY_BARS + 1);
    assert!(out.equity_values().iter().all(|e| *e == 10_000.0));
}

#[tokio::test]
async fn bad_price_repeats_prior_equity() {
    let store = intraday_store(&[(utc(2024, 1, 1, 13, 0), 0.0)]);
    let oracle = ScriptedOracle::new([
        (utc(2024, 1, 1, 12, 0), decision(Action::Long, None, None)),
        (utc(2024, 1, 1, 13, 0), decision(Action::Short, None, None)),
        (utc(2024, 1, 1, 13, 15), decision(Action::Short, None, None)),
    ]);
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.invalid_prices, 1);
    let at = |h, m| {
        out.equity
            .iter()
            .find(|s| s.timestamp == Some(utc(2024, 1, 1, h, m)))
            .unwrap()
            .equity
    };
    let qty = 10_000.0 / 148.0;
    assert_eq!(at(12, 45), qty * 147.0);
    assert_eq!(at(13, 0), at(12, 45));
    assert_eq!(at(13, 15), qty * 153.0);

    let actions: Vec<_> = out.trades.iter().map(|t| t.action).collect();
    assert_eq!(actions, [TradeAction::EnterLong, TradeAction::Exit]);
    assert_eq!(out.trades[1].price, 153.0);
}

// Taipei 06:00-21:00 is 22:00-13:00 UTC; plans are made at 22:00Z and positions
// are closed at 12:00Z (20:00 local).
#[tokio::test]
async fn session_plan_enters_at_levels_and_closes_at_session_end() {
    let store = hourly_store(
        105.0,
        &[
            (utc(2024, 1, 1, 1, 0), 100.3),
            (utc(2024, 1, 1, 12, 0), 110.0),
            (utc(2024, 1, 2, 3, 0), 119.5),
        ],
    );
    let oracle = ScriptedOracle::new([
        (utc(2023, 12, 31, 22, 0), decision(Action::Long, Some(100.0), Some(130.0))),
        (utc(2024, 1, 1, 22, 0), decision(Action::Short, Some(90.0), Some(120.0))),
    ]);
    let engine = Backtester::from_config(&asia(), &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.bars_processed, 30);
    assert_eq!(
        oracle.call_times(),
        [utc(2023, 12, 31, 22, 0), utc(2024, 1, 1, 22, 0)]
    );
    assert_eq!(out.stats.plans, 2);
    assert_eq!(out.plans[0].session_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(out.plans[1].session_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    // no primary lookback: weekly, daily and hourly only
    assert!(oracle.calls.lock().unwrap().iter().all(|(_, n)| *n == 3));

    let actions: Vec<_> = out.trades.iter().map(|t| t.action).collect();
    assert_eq!(
        actions,
        [
            TradeAction::EnterLong,
            TradeAction::ForcedClose,
            TradeAction::EnterShort,
            TradeAction::ForcedClose,
        ]
    );
    assert_eq!(out.trades[0].timestamp, utc(2024, 1, 1, 1, 0));
    assert_eq!(out.trades[1].timestamp, utc(2024, 1, 1, 12, 0));
    assert_eq!(out.trades[2].timestamp, utc(2024, 1, 2, 3, 0));
    assert_eq!(out.trades[3].timestamp, utc(2024, 1, 2, 12, 0));
    assert_eq!(out.stats.forced_closes, 2);
    assert!(out.final_state.is_flat());

    let after_long = 10_000.0 + (10_000.0 / 100.3) * (110.0 - 100.3);
    assert_eq!(out.trades[1].pnl, Some((10_000.0 / 100.3) * (110.0 - 100.3)));
    let short_qty = -after_long / 119.5;
    let after_short = after_long + short_qty * (105.0 - 119.5);
    assert_eq!(out.final_state.capital(), after_short);
    assert!(after_short > after_long);
}

#[tokio::test]
async fn failed_plan_holds_for_the_whole_session() {
    let store = hourly_store(100.0, &[]);
    let engine = Backtester::from_config(&asia(), &store).unwrap();
    let out = engine.run(&FailingOracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.oracle_calls, 2);
    assert_eq!(out.stats.oracle_failures, 2);
    assert_eq!(out.stats.plans, 0);
    assert!(out.trades.is_empty());
    assert_eq!(out.equity.len(), out.stats.bars_processed + 1);
}

#[tokio::test]
async fn full_day_plan_covers_hours_after_midnight() {
    let mut config = asia();
    config.session.start_hour = 6;
    config.session.end_hour = 6;
    config.session.close_time = None;
    // 2024-01-01T17:00Z is 01:00 on Jan 2 in Taipei, still inside the Jan 1 session
    let store = hourly_store(105.0, &[(utc(2024, 1, 1, 17, 0), 100.3)]);
    let oracle = ScriptedOracle::new([(
        utc(2023, 12, 31, 22, 0),
        decision(Action::Long, Some(100.0), None),
    )])
    .failing_at([utc(2024, 1, 1, 22, 0)]);
    let engine = Backtester::from_config(&config, &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.bars_processed, 48);
    assert_eq!(
        oracle.call_times(),
        [utc(2023, 12, 31, 22, 0), utc(2024, 1, 1, 22, 0)]
    );
    assert_eq!(out.trades.len(), 1);
    assert_eq!(out.trades[0].action, TradeAction::EnterLong);
    assert_eq!(out.trades[0].timestamp, utc(2024, 1, 1, 17, 0));

    // the next session's plan fails: the long is kept and still marked
    assert_eq!(out.stats.oracle_failures, 1);
    assert!(out.final_state.is_long());
    let marked = 10_000.0 + (10_000.0 / 100.3) * (105.0 - 100.3);
    let failed_bar = out
        .equity
        .iter()
        .find(|s| s.timestamp == Some(utc(2024, 1, 1, 22, 0)))
        .unwrap();
    assert_eq!(failed_bar.equity, marked);
    assert_eq!(out.equity.last().unwrap().equity, marked);
}

#[tokio::test]
async fn overnight_plan_enters_after_midnight_and_closes_before_dawn() {
    let mut config = asia();
    config.session.start_hour = 20;
    config.session.end_hour = 5;
    config.session.close_time = Some("04:00".into());
    // Taipei 20:00-05:00 is 12:00-21:00 UTC; 17:00Z is 01:00 and 20:00Z is 04:00 local
    let store = hourly_store(
        105.0,
        &[(utc(2024, 1, 1, 17, 0), 100.3), (utc(2024, 1, 1, 20, 0), 110.0)],
    );
    let oracle = ScriptedOracle::new([(
        utc(2024, 1, 1, 12, 0),
        decision(Action::Long, Some(100.0), None),
    )]);
    let engine = Backtester::from_config(&config, &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.bars_processed, 18);
    assert_eq!(
        oracle.call_times(),
        [utc(2024, 1, 1, 12, 0), utc(2024, 1, 2, 12, 0)]
    );
    let actions: Vec<_> = out.trades.iter().map(|t| (t.action, t.timestamp)).collect();
    assert_eq!(
        actions,
        [
            (TradeAction::EnterLong, utc(2024, 1, 1, 17, 0)),
            (TradeAction::ForcedClose, utc(2024, 1, 1, 20, 0)),
        ]
    );
    assert!(out.final_state.is_flat());
    assert_eq!(
        out.final_state.capital(),
        10_000.0 + (10_000.0 / 100.3) * (110.0 - 100.3)
    );
}

#[tokio::test]
async fn oracle_failure_while_long_keeps_the_position() {
    let store = intraday_store(&[]);
    let oracle = ScriptedOracle::new([
        (utc(2024, 1, 1, 12, 0), decision(Action::Long, None, None)),
        (utc(2024, 1, 1, 13, 0), decision(Action::Short, None, None)),
    ])
    .failing_at([
        utc(2024, 1, 1, 12, 15),
        utc(2024, 1, 1, 12, 30),
        utc(2024, 1, 1, 12, 45),
    ]);
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    assert_eq!(out.stats.oracle_failures, 3);
    let actions: Vec<_> = out.trades.iter().map(|t| t.action).collect();
    assert_eq!(actions, [TradeAction::EnterLong, TradeAction::Exit]);
    assert_eq!(out.trades[1].price, 152.0);

    let qty = 10_000.0 / 148.0;
    let equity = out.equity_values();
    // samples 2..=4 are the failed bars, marked at 149, 150 and 151
    assert_eq!(equity[2], qty * 149.0);
    assert_eq!(equity[3], qty * 150.0);
    assert_eq!(equity[4], qty * 151.0);
    assert_eq!(out.equity.len(), INTRADAY_BARS + 1);
}

#[tokio::test]
async fn never_holds_two_positions() {
    let store = intraday_store(&[]);
    let script = (0..INTRADAY_BARS as i64).map(|i| {
        let action = if i % 3 == 2 { Action::Short } else { Action::Long };
        (step(utc(2024, 1, 1, 12, 0), 15 * i), decision(action, None, None))
    });
    let oracle = ScriptedOracle::new(script);
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    // entries and exits strictly alternate
    for (i, t) in out.trades.iter().enumerate() {
        let expected = if i % 2 == 0 { TradeAction::EnterLong } else { TradeAction::Exit };
        assert_eq!(t.action, expected, "trade {i}");
    }
    assert!(!out.trades.is_empty());
    assert_eq!(out.equity.len(), INTRADAY_BARS + 1);
}

#[tokio::test]
async fn run_writes_output_files() {
    let store = intraday_store(&[]);
    let oracle = ScriptedOracle::new([
        (utc(2024, 1, 1, 12, 0), decision(Action::Long, None, None)),
        (utc(2024, 1, 1, 14, 0), decision(Action::Short, None, None)),
    ]);
    let tmp = tempfile::tempdir().unwrap();
    let mut recorder = FileRecorder::create(tmp.path().join("out")).unwrap();
    let engine = Backtester::from_config(&intraday(), &store).unwrap();
    let out = engine.run(&oracle, &mut recorder).await.unwrap();

    let dir = tmp.path().join("out");
    let curve = std::fs::read_to_string(dir.join(EQUITY_CURVE)).unwrap();
    assert_eq!(curve.lines().count(), out.equity.len() + 1);
    assert!(curve.starts_with("step,timestamp,equity"));

    let log = std::fs::read_to_string(dir.join(TRADING_LOG)).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("2024-01-01 12:00:00 UTC - ENTER LONG - price: 148.00"));
    assert!(lines[1].contains("EXIT"));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(SUMMARY)).unwrap()).unwrap();
    assert_eq!(summary["symbol"], "BTCUSDT");
    assert_eq!(summary["mode"], "per_bar");
    assert_eq!(summary["stats"]["trades"], 2);
    assert_eq!(summary["first_bar"], "2024-01-01T12:00:00Z");
    assert!(summary["performance"].get("returns").is_none());
}

#[tokio::test]
async fn stats_summary_shape() {
    let store = hourly_store(105.0, &[(utc(2024, 1, 1, 1, 0), 100.3)]);
    let oracle = ScriptedOracle::new([(
        utc(2023, 12, 31, 22, 0),
        decision(Action::Long, Some(100.0), None),
    )]);
    let engine = Backtester::from_config(&asia(), &store).unwrap();
    let out = engine.run(&oracle, &mut DiscardRecorder).await.unwrap();

    insta::assert_json_snapshot!(out.stats, @r#"
    {
      "bars_processed": 30,
      "oracle_calls": 2,
      "oracle_failures": 0,
      "long_signals": 1,
      "short_signals": 0,
      "hold_signals": 1,
      "plans": 2,
      "trades": 2,
      "forced_closes": 1,
      "invalid_prices": 0
    }
    "#);
}

#[tokio::test]
async fn replays_history_loaded_from_csv() {
    let tmp = tempfile::tempdir().unwrap();
    write_store(tmp.path(), &intraday_store(&[]));

    let mut config = intraday();
    config.data_dir = tmp.path().to_path_buf();
    let store =
        TimeframeStore::load(&config.data_dir, &config.symbol, config.primary_timeframe).unwrap();
    assert_eq!(store.primary().timeframe, TimeFrame::minutes_15());

    let engine = Backtester::from_config(&config, &store).unwrap();
    let out = engine.run(&HoldOracle, &mut DiscardRecorder).await.unwrap();
    assert_eq!(out.stats.bars_processed, INTRADAY_BARS);
}

#[test]
fn rejects_invalid_config_before_running() {
    let store = intraday_store(&[]);
    let mut config = intraday();
    config.strategy.allow_short = true;
    assert!(Backtester::from_config(&config, &store).is_err());

    let mut config = intraday();
    config.strategy.mode = DecisionMode::SessionPlan;
    config.end_date = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
    assert!(Backtester::from_config(&config, &store).is_err());
}
