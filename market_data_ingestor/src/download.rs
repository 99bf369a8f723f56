//! Multi-timeframe history download: one request per interval, same window.

use chrono::{DateTime, Utc};

use crate::{
    errors::Error,
    io::DataSink,
    models::{bar::BarSeries, request_params::BarsRequestParams, timeframe::TimeFrame},
    providers::DataProvider,
};

/// What to download.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    pub symbol: String,
    pub timeframes: Vec<TimeFrame>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Fetches every requested timeframe in order. Stops at the first provider failure.
pub async fn fetch_all(
    provider: &(dyn DataProvider + Send + Sync),
    request: &DownloadRequest,
) -> Result<Vec<BarSeries>, Error> {
    if request.timeframes.is_empty() {
        return Err(Error::Config("no timeframes requested".into()));
    }
    if request.end < request.start {
        return Err(Error::Config(format!(
            "end {} precedes start {}",
            request.end, request.start
        )));
    }

    let mut out = Vec::with_capacity(request.timeframes.len());
    for tf in &request.timeframes {
        tracing::info!(symbol = %request.symbol, timeframe = %tf, "downloading");
        let series = provider
            .fetch_bars(BarsRequestParams {
                symbol: request.symbol.clone(),
                timeframe: *tf,
                start: request.start,
                end: request.end,
            })
            .await?;
        if series.is_empty() {
            tracing::warn!(symbol = %request.symbol, timeframe = %tf, "provider returned no bars");
        }
        out.push(series);
    }
    Ok(out)
}

/// [`fetch_all`] followed by a sink write; returns whatever the sink reports.
pub async fn download<S>(
    provider: &(dyn DataProvider + Send + Sync),
    sink: &S,
    request: &DownloadRequest,
) -> Result<S::Output, Error>
where
    S: DataSink + Sync,
{
    let series = fetch_all(provider, request).await?;
    Ok(sink.write(&series).await?)
}
