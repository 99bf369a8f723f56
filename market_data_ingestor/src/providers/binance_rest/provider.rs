use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use shared_utils::env::get_env_var_opt;
use snafu::ResultExt;

use crate::{
    models::{
        bar::{Bar, BarSeries},
        request_params::BarsRequestParams,
    },
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, InternalSnafu, ProviderError, ProviderInitError,
        ReqwestSnafu, ValidationSnafu,
        binance_rest::{
            params::{PAGE_LIMIT, construct_params, validate_timeframe},
            response::{RawKline, decode_kline},
        },
    },
};

const BASE_URL: &str = "https://api.binance.com";
const KLINES_PATH: &str = "/api/v3/klines";

pub struct BinanceProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl BinanceProvider {
    /// Creates a provider against the public Binance endpoint.
    ///
    /// `BINANCE_BASE_URL` overrides the host (e.g. a regional mirror).
    pub fn new() -> Result<Self, ProviderInitError> {
        let base_url = get_env_var_opt("BINANCE_BASE_URL").unwrap_or_else(|| BASE_URL.to_string());
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(concat!("market_data_ingestor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientBuildSnafu)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            // two pages per second
            limiter: RateLimiter::direct(Quota::per_second(nonzero!(2u32))),
        })
    }

    async fn fetch_page(
        &self,
        params: &BarsRequestParams,
        start_ms: i64,
    ) -> Result<Vec<RawKline>, ProviderError> {
        self.limiter.until_ready().await;

        let query = construct_params(params, start_ms);
        let url = format!("{}{}", self.base_url, KLINES_PATH);
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .context(ReqwestSnafu)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu { status, message }.fail();
        }

        response.json::<Vec<RawKline>>().await.context(ReqwestSnafu)
    }
}

#[async_trait]
impl DataProvider for BinanceProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<BarSeries, ProviderError> {
        validate_timeframe(&params.timeframe)?;
        if params.end < params.start {
            return ValidationSnafu {
                message: format!("end {} precedes start {}", params.end, params.start),
            }
            .fail();
        }

        let end_ms = params.end.timestamp_millis();
        let mut start_ms = params.start.timestamp_millis();
        let mut bars: Vec<Bar> = Vec::new();

        while start_ms <= end_ms {
            let rows = self.fetch_page(&params, start_ms).await?;
            let page_len = rows.len();
            let mut next_start = start_ms;

            for row in &rows {
                let kline = decode_kline(row)?;
                next_start = kline.close_time_ms;
                // pages may overlap on the boundary bar
                if bars.last().is_some_and(|b| b.timestamp >= kline.bar.timestamp) {
                    continue;
                }
                bars.push(kline.bar);
            }

            tracing::debug!(
                symbol = %params.symbol,
                timeframe = %params.timeframe,
                page_len,
                total = bars.len(),
                "fetched klines page"
            );

            if page_len < PAGE_LIMIT as usize {
                break;
            }
            if next_start <= start_ms {
                return InternalSnafu {
                    message: format!("klines paging made no progress at {start_ms}"),
                }
                .fail();
            }
            start_ms = next_start;
        }

        tracing::info!(
            symbol = %params.symbol,
            timeframe = %params.timeframe,
            bars = bars.len(),
            "download complete"
        );

        Ok(BarSeries {
            symbol: params.symbol.to_uppercase(),
            timeframe: params.timeframe,
            bars,
        })
    }
}
