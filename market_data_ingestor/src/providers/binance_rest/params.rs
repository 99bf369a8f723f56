use serde::Serialize;

use crate::{
    models::{
        request_params::BarsRequestParams,
        timeframe::{TimeFrame, TimeFrameUnit},
    },
    providers::{ProviderError, ValidationSnafu},
};

/// Maximum rows Binance returns for one klines request.
pub const PAGE_LIMIT: u32 = 1000;

/// Query string for one klines page.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KlinesQuery {
    pub symbol: String,
    pub interval: String,
    pub start_time: i64,
    pub end_time: i64,
    pub limit: u32,
}

/// Builds the query for the page starting at `start_ms`.
pub fn construct_params(params: &BarsRequestParams, start_ms: i64) -> KlinesQuery {
    KlinesQuery {
        symbol: params.symbol.to_uppercase(),
        interval: params.timeframe.to_string(),
        start_time: start_ms,
        end_time: params.end.timestamp_millis(),
        limit: PAGE_LIMIT,
    }
}

/// Binance only serves a fixed menu of intervals.
pub fn validate_timeframe(tf: &TimeFrame) -> Result<(), ProviderError> {
    let ok = match tf.unit {
        TimeFrameUnit::Minute => [1, 3, 5, 15, 30].contains(&tf.amount),
        TimeFrameUnit::Hour => [1, 2, 4, 6, 8, 12].contains(&tf.amount),
        TimeFrameUnit::Day => tf.amount == 1,
        TimeFrameUnit::Week => tf.amount == 1,
        TimeFrameUnit::Month => tf.amount == 1,
    };
    if ok {
        Ok(())
    } else {
        ValidationSnafu {
            message: format!("Binance does not serve {tf} klines"),
        }
        .fail()
    }
}
