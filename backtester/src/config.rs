//! Run configuration: TOML shape, defaults, presets and validation.
//!
//! Entrypoints:
//! - Parse + validate from a TOML string: [`load_config_str`]
//! - Parse + validate from a file path: [`load_config_path`]
//! - Shipped presets: [`RunConfig::intraday_15m`], [`RunConfig::asia_session`]
//!
//! Optional sections fall back to their `Default`; unknown keys are rejected.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use market_data_ingestor::models::timeframe::TimeFrame;
use serde::{Deserialize, Serialize};
use shared_utils::config::load_toml;

use crate::account::EquityConvention;
use crate::context::{DecisionMode, Lookbacks};
use crate::errors::BacktestError;
use crate::oracle::{CompletionSettings, Language};
use crate::session::SessionWindow;
use crate::strategy::StrategyRules;
use crate::tz::{DstPolicy, local_date_range, parse_tz};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub symbol: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// First local date (session time zone) of the run, inclusive.
    pub start_date: NaiveDate,
    /// Last local date of the run, inclusive.
    pub end_date: NaiveDate,
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    /// Interval of the series the engine walks ("15m", "1h").
    pub primary_timeframe: TimeFrame,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub lookbacks: Lookbacks,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub annualization: AnnualizationConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub timezone: String,
    /// Local "HH:MM" at which open positions are force-closed.
    pub close_time: Option<String>,
    pub dst_policy: DstPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_hour: 20,
            end_hour: 5,
            timezone: "Asia/Taipei".into(),
            close_time: None,
            dst_policy: DstPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StrategyConfig {
    pub mode: DecisionMode,
    pub allow_short: bool,
    pub equity_convention: EquityConvention,
    pub entry_tolerance: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mode: DecisionMode::PerBar,
            allow_short: false,
            equity_convention: EquityConvention::FullReinvestment,
            entry_tolerance: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AnnualizationConfig {
    /// Explicit factor; when absent it is derived from the session length.
    pub factor: Option<f64>,
    pub trading_days_per_year: u32,
}

impl Default for AnnualizationConfig {
    fn default() -> Self {
        Self {
            factor: None,
            trading_days_per_year: 252,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OracleConfig {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Decisions are sampled deterministically; only `0.0` validates.
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Minimum spacing between oracle calls.
    pub min_interval_secs: f64,
    pub language: Language,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.0,
            max_tokens: 1000,
            timeout_secs: 60,
            min_interval_secs: 30.0,
            language: Language::ZhTw,
        }
    }
}

impl OracleConfig {
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(self.min_interval_secs.max(0.0))
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./backtest_results")
}

fn default_capital() -> f64 {
    10_000.0
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::intraday_15m()
    }
}

impl RunConfig {
    /// Per-bar decisions on 15m bars through the 20:00-05:00 Taipei session.
    pub fn intraday_15m() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 6, 30),
            initial_capital: default_capital(),
            primary_timeframe: TimeFrame::minutes_15(),
            session: SessionConfig::default(),
            lookbacks: Lookbacks::default(),
            strategy: StrategyConfig::default(),
            annualization: AnnualizationConfig {
                // 6.5 hours of four 15m bars a day
                factor: Some(252.0 * 6.5 * 4.0),
                trading_days_per_year: 252,
            },
            oracle: OracleConfig::default(),
        }
    }

    /// One plan per day at 06:00 Taipei on hourly bars, long/short, closed out at 20:00.
    pub fn asia_session() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            data_dir: PathBuf::from("./btc_data"),
            output_dir: PathBuf::from("./backtest_asia"),
            start_date: date(2024, 1, 1),
            end_date: date(2024, 6, 30),
            initial_capital: default_capital(),
            primary_timeframe: TimeFrame::hour(),
            session: SessionConfig {
                start_hour: 6,
                end_hour: 21,
                timezone: "Asia/Taipei".into(),
                close_time: Some("20:00".into()),
                dst_policy: DstPolicy::default(),
            },
            lookbacks: Lookbacks {
                weekly: 26,
                daily: 180,
                hourly: 48,
                primary: 0,
            },
            strategy: StrategyConfig {
                mode: DecisionMode::SessionPlan,
                allow_short: true,
                equity_convention: EquityConvention::Margin,
                entry_tolerance: 0.005,
            },
            annualization: AnnualizationConfig {
                factor: Some(252.0 * 10.0),
                trading_days_per_year: 252,
            },
            oracle: OracleConfig {
                min_interval_secs: 0.0,
                ..OracleConfig::default()
            },
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        let bad = |msg: String| Err(BacktestError::Config(msg));

        if self.symbol.trim().is_empty() {
            return bad("symbol cannot be empty".into());
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return bad(format!("initial_capital must be positive, got {}", self.initial_capital));
        }
        if self.start_date > self.end_date {
            return bad(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            ));
        }
        let tol = self.strategy.entry_tolerance;
        if !(0.0..1.0).contains(&tol) {
            return bad(format!("entry_tolerance must be in [0, 1), got {tol}"));
        }
        if self.strategy.allow_short
            && self.strategy.equity_convention == EquityConvention::FullReinvestment
        {
            return bad("allow_short requires equity_convention = \"margin\"".into());
        }
        if let Some(f) = self.annualization.factor {
            if !(f.is_finite() && f > 0.0) {
                return bad(format!("annualization factor must be positive, got {f}"));
            }
        }
        let o = &self.oracle;
        if o.temperature != 0.0 {
            return bad(format!("oracle temperature must be 0, got {}", o.temperature));
        }
        if !o.min_interval_secs.is_finite() || o.min_interval_secs < 0.0 {
            return bad(format!("min_interval_secs must be >= 0, got {}", o.min_interval_secs));
        }
        if o.timeout_secs == 0 {
            return bad("oracle timeout_secs must be positive".into());
        }

        // these build the derived values and carry their own checks
        self.session_window()?;
        self.date_range()?;
        self.annualization_factor()?;
        Ok(())
    }

    pub fn session_window(&self) -> Result<SessionWindow, BacktestError> {
        let s = &self.session;
        let window = SessionWindow::new(s.start_hour, s.end_hour, parse_tz(&s.timezone)?)?;
        match &s.close_time {
            Some(raw) => window.with_close_time(parse_close_time(raw)?),
            None => Ok(window),
        }
    }

    /// Half-open UTC range covering `start_date..=end_date` in the session zone.
    pub fn date_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), BacktestError> {
        let tz = parse_tz(&self.session.timezone)?;
        Ok(local_date_range(
            self.start_date,
            self.end_date,
            tz,
            self.session.dst_policy,
        )?)
    }

    /// Explicit factor, or session hours x primary bars per hour x trading days.
    pub fn annualization_factor(&self) -> Result<f64, BacktestError> {
        if let Some(f) = self.annualization.factor {
            return Ok(f);
        }
        let per_hour = self.primary_timeframe.bars_per_hour().ok_or_else(|| {
            BacktestError::Config(format!(
                "cannot derive an annualization factor for {} bars; set annualization.factor",
                self.primary_timeframe
            ))
        })?;
        let hours = self.session_window()?.hours() as f64;
        Ok(hours * per_hour * self.annualization.trading_days_per_year as f64)
    }

    pub fn strategy_rules(&self) -> StrategyRules {
        StrategyRules {
            mode: self.strategy.mode,
            allow_short: self.strategy.allow_short,
            entry_tolerance: self.strategy.entry_tolerance,
        }
    }
}

fn parse_close_time(raw: &str) -> Result<NaiveTime, BacktestError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| BacktestError::Config(format!("bad close_time {raw:?}: {e}")))
}

/// Parse and validate a run configuration from TOML text.
pub fn load_config_str(s: &str) -> Result<RunConfig, BacktestError> {
    let cfg: RunConfig =
        toml::from_str(s).map_err(|e| BacktestError::Config(format!("bad run config: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Read, parse and validate a run configuration file.
pub fn load_config_path(path: impl AsRef<Path>) -> Result<RunConfig, BacktestError> {
    let cfg: RunConfig = load_toml(path)?;
    cfg.validate()?;
    Ok(cfg)
}
