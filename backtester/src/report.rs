//! Run output: trade/plan log, equity curve, summary.
//!
//! Records are streamed as the engine produces them and each file is flushed per
//! record, so a run killed midway leaves readable partial output.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{AccountState, EquityConvention, TradeLogEntry};
use crate::context::DecisionMode;
use crate::engine::RunStats;
use crate::errors::ReportError;
use crate::performance::PerformanceReport;

pub const TRADING_LOG: &str = "trading_log.txt";
pub const EQUITY_CURVE: &str = "equity_curve.csv";
pub const SUMMARY: &str = "summary.json";

/// One point of the equity curve. Step 0 is the initial capital and has no timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub step: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub equity: f64,
}

/// A session plan as the oracle wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanLogEntry {
    pub timestamp: DateTime<Utc>,
    pub session_date: NaiveDate,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub symbol: String,
    pub mode: DecisionMode,
    pub equity_convention: EquityConvention,
    pub first_bar: Option<DateTime<Utc>>,
    pub last_bar: Option<DateTime<Utc>>,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub final_state: AccountState,
    pub stats: RunStats,
    pub performance: PerformanceReport,
}

pub trait RunRecorder {
    fn record_trade(&mut self, trade: &TradeLogEntry) -> Result<(), ReportError>;
    fn record_plan(&mut self, plan: &PlanLogEntry) -> Result<(), ReportError>;
    fn record_equity(&mut self, sample: &EquitySample) -> Result<(), ReportError>;
    fn finish(&mut self, summary: &RunSummary) -> Result<(), ReportError>;
}

/// Keeps nothing. For callers that only want the returned outcome.
#[derive(Debug, Default)]
pub struct DiscardRecorder;

impl RunRecorder for DiscardRecorder {
    fn record_trade(&mut self, _: &TradeLogEntry) -> Result<(), ReportError> {
        Ok(())
    }
    fn record_plan(&mut self, _: &PlanLogEntry) -> Result<(), ReportError> {
        Ok(())
    }
    fn record_equity(&mut self, _: &EquitySample) -> Result<(), ReportError> {
        Ok(())
    }
    fn finish(&mut self, _: &RunSummary) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Writes [`TRADING_LOG`], [`EQUITY_CURVE`] and [`SUMMARY`] into one directory.
pub struct FileRecorder {
    dir: PathBuf,
    log_path: PathBuf,
    log: BufWriter<File>,
    equity_path: PathBuf,
    equity: csv::Writer<File>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ReportError + '_ {
    move |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl FileRecorder {
    /// Creates the directory if needed and truncates any previous output.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;

        let log_path = dir.join(TRADING_LOG);
        let log = BufWriter::new(File::create(&log_path).map_err(io_err(&log_path))?);

        let equity_path = dir.join(EQUITY_CURVE);
        let equity = csv::Writer::from_path(&equity_path).map_err(|source| ReportError::Csv {
            path: equity_path.clone(),
            source,
        })?;

        Ok(Self {
            dir,
            log_path,
            log,
            equity_path,
            equity,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_log_line(&mut self, line: &str) -> Result<(), ReportError> {
        writeln!(self.log, "{line}").map_err(io_err(&self.log_path))?;
        self.log.flush().map_err(io_err(&self.log_path))
    }
}

impl RunRecorder for FileRecorder {
    fn record_trade(&mut self, trade: &TradeLogEntry) -> Result<(), ReportError> {
        let pnl = trade
            .pnl
            .map(|p| format!(" - pnl: {p:.2}"))
            .unwrap_or_default();
        let line = format!(
            "{} - {} - price: {:.2} - qty: {:.6}{} - {}",
            trade.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            trade.action,
            trade.price,
            trade.quantity,
            pnl,
            one_line(&trade.rationale)
        );
        self.write_log_line(&line)
    }

    fn record_plan(&mut self, plan: &PlanLogEntry) -> Result<(), ReportError> {
        let line = format!(
            "{} - PLAN {} - {}",
            plan.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            plan.session_date,
            one_line(&plan.text)
        );
        self.write_log_line(&line)
    }

    fn record_equity(&mut self, sample: &EquitySample) -> Result<(), ReportError> {
        self.equity
            .serialize(sample)
            .map_err(|source| ReportError::Csv {
                path: self.equity_path.clone(),
                source,
            })?;
        self.equity.flush().map_err(io_err(&self.equity_path))
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<(), ReportError> {
        let path = self.dir.join(SUMMARY);
        let file = File::create(&path).map_err(io_err(&path))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, summary)?;
        w.flush().map_err(io_err(&path))?;
        tracing::info!(dir = %self.dir.display(), "run output written");
        Ok(())
    }
}
