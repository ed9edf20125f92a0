//! HTTP client for the Binance spot REST API.
//!
//! Only the two public endpoints the cache needs are covered:
//! `GET /api/v3/klines` and `GET /api/v3/exchangeInfo`. Errors are reported
//! as raw `SourceError`s; deciding what is fatal is the fetcher's job.

use crate::error::{RegistryError, RegistryResult, SourceError};
use crate::source::{ExchangeInfoSource, KlineSource, PageRequest};
use asmm_core::Candle;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Public Binance spot endpoint.
pub const DEFAULT_REST_URL: &str = "https://api.binance.com";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for public Binance market data.
pub struct BinanceClient {
    /// HTTP client.
    client: Client,
    /// REST base URL without trailing slash.
    base_url: String,
}

impl BinanceClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - REST root (e.g., "https://api.binance.com")
    pub fn new(base_url: impl Into<String>) -> RegistryResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("GET {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Decode(format!("Failed to parse {path} response: {e}")))
    }
}

impl KlineSource for BinanceClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Candle>, SourceError> {
        let mut query = vec![
            ("symbol", request.symbol.clone()),
            ("interval", request.interval.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(start) = request.start_time_ms {
            query.push(("startTime", start.to_string()));
        }
        if let Some(end) = request.end_time_ms {
            query.push(("endTime", end.to_string()));
        }

        let body = self.get_json("/api/v3/klines", &query).await?;
        let candles = parse_klines(&body)?;

        debug!(
            symbol = %request.symbol,
            interval = %request.interval,
            count = candles.len(),
            "Klines page fetched"
        );
        Ok(candles)
    }
}

impl ExchangeInfoSource for BinanceClient {
    async fn fetch_exchange_info(&self) -> Result<Value, SourceError> {
        info!(url = %self.base_url, "Fetching exchangeInfo");
        self.get_json("/api/v3/exchangeInfo", &[]).await
    }
}

/// Parse a klines response body.
///
/// Each row is `[openTime, open, high, low, close, volume, closeTime, ...]`
/// with prices encoded as strings. Row order is preserved; rows whose OHLC
/// values are out of order are dropped with a warning.
pub fn parse_klines(body: &Value) -> Result<Vec<Candle>, SourceError> {
    let rows = body
        .as_array()
        .ok_or_else(|| SourceError::Decode("klines response is not an array".to_string()))?;

    let mut candles = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let fields = row
            .as_array()
            .filter(|fields| fields.len() >= 6)
            .ok_or_else(|| SourceError::Decode(format!("kline row {idx} is malformed: {row}")))?;

        let open_time = fields[0]
            .as_i64()
            .ok_or_else(|| SourceError::Decode(format!("kline row {idx} has no open time")))?;

        let candle = Candle::from_open_time_ms(
            open_time,
            parse_number(&fields[1])?,
            parse_number(&fields[2])?,
            parse_number(&fields[3])?,
            parse_number(&fields[4])?,
            parse_number(&fields[5])?,
        )
        .map_err(|e| SourceError::Decode(e.to_string()))?;
        if let Err(e) = candle.validate() {
            warn!(row = idx, error = %e, "Skipping inconsistent kline");
            continue;
        }
        candles.push(candle);
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_number(value: &Value) -> Result<f64, SourceError> {
    match value {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| SourceError::Decode(format!("failed to parse '{s}' as f64: {e}"))),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| SourceError::Decode(format!("number out of range: {n}"))),
        other => Err(SourceError::Decode(format!(
            "expected string or number, got: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_klines_rows() {
        let body = json!([
            [1704067200000i64, "42283.58", "42554.57", "42261.02", "42475.23", "1271.68108", 1704070799999i64, "0", 0, "0", "0", "0"],
            [1704070800000i64, "42475.23", "42775.00", "42431.65", "42613.56", "1196.37856", 1704074399999i64, "0", 0, "0", "0", "0"]
        ]);

        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time_ms(), 1_704_067_200_000);
        assert_eq!(candles[0].open, 42283.58);
        assert_eq!(candles[0].volume, 1271.68108);
        assert_eq!(candles[1].close, 42613.56);
    }

    #[test]
    fn test_parse_klines_accepts_numbers() {
        let body = json!([[0, 1.0, 2.0, 0.5, 1.5, 10]]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles[0].high, 2.0);
        assert_eq!(candles[0].volume, 10.0);
    }

    #[test]
    fn test_parse_klines_skips_inconsistent_rows() {
        let body = json!([
            [0, "1.0", "2.0", "0.5", "1.5", "10"],
            [60000, "1.5", "1.2", "1.4", "1.3", "10"],
            [120000, "1.3", "1.6", "1.1", "1.5", "NaN"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].open_time_ms(), 0);
    }

    #[test]
    fn test_parse_klines_empty_page() {
        assert!(parse_klines(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_klines_rejects_bad_shapes() {
        assert!(matches!(
            parse_klines(&json!({"code": -1121})),
            Err(SourceError::Decode(_))
        ));
        assert!(matches!(
            parse_klines(&json!([[0, "1", "2"]])),
            Err(SourceError::Decode(_))
        ));
        assert!(matches!(
            parse_klines(&json!([[0, "x", "2", "1", "1", "1"]])),
            Err(SourceError::Decode(_))
        ));
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = BinanceClient::new("https://api.binance.com/").unwrap();
        assert_eq!(client.base_url(), DEFAULT_REST_URL);
    }
}
