use chrono::DateTime;
use serde_json::Value;

use crate::{
    models::bar::Bar,
    providers::{InternalSnafu, ProviderError},
};

/// One kline row as Binance sends it: a 12-element heterogeneous array
/// `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`.
pub type RawKline = Vec<Value>;

/// A decoded kline: the bar plus the close time used to page forward.
#[derive(Debug, Clone, PartialEq)]
pub struct Kline {
    pub bar: Bar,
    pub close_time_ms: i64,
}

fn int_at(row: &[Value], i: usize) -> Result<i64, ProviderError> {
    row.get(i).and_then(Value::as_i64).ok_or_else(|| {
        InternalSnafu {
            message: format!("kline field {i} is not an integer"),
        }
        .build()
    })
}

fn float_at(row: &[Value], i: usize) -> Result<f64, ProviderError> {
    // prices arrive as decimal strings
    let parsed = match row.get(i) {
        Some(Value::String(s)) => s.parse::<f64>().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        InternalSnafu {
            message: format!("kline field {i} is not a number"),
        }
        .build()
    })
}

pub fn decode_kline(row: &[Value]) -> Result<Kline, ProviderError> {
    let open_time = int_at(row, 0)?;
    let timestamp = DateTime::from_timestamp_millis(open_time).ok_or_else(|| {
        InternalSnafu {
            message: format!("kline open time {open_time} out of range"),
        }
        .build()
    })?;
    Ok(Kline {
        bar: Bar {
            timestamp,
            open: float_at(row, 1)?,
            high: float_at(row, 2)?,
            low: float_at(row, 3)?,
            close: float_at(row, 4)?,
            volume: float_at(row, 5)?,
        },
        close_time_ms: int_at(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn decodes_documented_row() {
        let row: RawKline = serde_json::from_str(
            r#"[1704067200000,"42283.58","42554.57","42261.02","42475.23","1271.68108",
                1704070799999,"53957248.973789",47134,"682.57581","28957416.819645","0"]"#,
        )
        .unwrap();
        let k = decode_kline(&row).unwrap();
        assert_eq!(k.bar.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(k.bar.close, 42475.23);
        assert_eq!(k.close_time_ms, 1704070799999);
    }

    #[test]
    fn short_row_is_internal_error() {
        let row: RawKline = serde_json::from_str(r#"[1704067200000,"1.0"]"#).unwrap();
        assert!(matches!(decode_kline(&row), Err(ProviderError::Internal { .. })));
    }
}
