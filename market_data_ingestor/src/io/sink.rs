use std::path::PathBuf;

use async_trait::async_trait;
use snafu::{Backtrace, ResultExt, Snafu};

use crate::io::csv_source::series_file_name;
use crate::models::bar::BarSeries;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// An error occurred while trying to write the data.
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    WriteError {
        path: PathBuf,
        source: csv::Error,
        backtrace: Backtrace,
    },

    /// A generic I/O error.
    #[snafu(display("I/O error: {source}"))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

#[async_trait]
pub trait DataSink {
    /// The type of output returned after a successful write operation.
    ///
    /// A file sink returns the paths it created; a database sink might return
    /// the number of rows inserted.
    type Output;

    /// Writes a slice of `BarSeries` to the destination.
    async fn write(&self, data: &[BarSeries]) -> Result<Self::Output, SinkError>;
}

/// Writes each series to `{dir}/{SYMBOL}_{interval}.csv`, the layout
/// [`load_series`](crate::io::csv_source::load_series) reads back.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_one(&self, series: &BarSeries) -> Result<PathBuf, SinkError> {
        let path = self.dir.join(series_file_name(&series.symbol, series.timeframe));
        let mut writer = csv::Writer::from_path(&path).context(WriteSnafu { path: path.clone() })?;
        writer
            .write_record(["timestamp", "open", "high", "low", "close", "volume"])
            .context(WriteSnafu { path: path.clone() })?;
        for bar in &series.bars {
            writer
                .write_record([
                    bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    bar.open.to_string(),
                    bar.high.to_string(),
                    bar.low.to_string(),
                    bar.close.to_string(),
                    bar.volume.to_string(),
                ])
                .context(WriteSnafu { path: path.clone() })?;
        }
        writer.flush().context(IoSnafu)?;
        Ok(path)
    }
}

#[async_trait]
impl DataSink for CsvSink {
    type Output = Vec<PathBuf>;

    async fn write(&self, data: &[BarSeries]) -> Result<Self::Output, SinkError> {
        std::fs::create_dir_all(&self.dir).context(IoSnafu)?;
        let mut paths = Vec::with_capacity(data.len());
        for series in data {
            let path = self.write_one(series)?;
            tracing::info!(path = %path.display(), bars = series.len(), "saved series");
            paths.push(path);
        }
        Ok(paths)
    }
}
