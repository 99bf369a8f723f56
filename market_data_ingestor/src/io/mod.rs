//! Reading series from disk and writing them back.

pub mod csv_source;
pub mod sink;

pub use csv_source::{DataLoadError, load_series, parse_timestamp, series_file_name};
pub use sink::{CsvSink, DataSink, SinkError};
