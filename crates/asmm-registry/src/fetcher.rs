//! Backward-walking kline pagination.
//!
//! The klines endpoint bounds pages from above, so history is collected
//! newest page first: each page moves the `endTime` cursor to one interval
//! before the oldest candle it returned, until a page comes back empty.
//! Candles are accumulated into one vector and ordered once at the end.

use crate::error::{RegistryError, RegistryResult, SourceError};
use crate::source::{KlineSource, PageRequest};
use asmm_core::{epoch_ms, Interval, Series};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Binance error code for an unknown symbol.
const INVALID_SYMBOL_CODE: i64 = -1121;

/// Pagination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Maximum candles requested per page.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_page_limit() -> u32 {
    1000
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
        }
    }
}

/// Transient pagination state for one `fetch` call.
#[derive(Debug, Default, Clone, Copy)]
struct FetchCursor {
    end_time_ms: Option<i64>,
    start_time_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<i64>,
}

/// Assembles a contiguous series from a paginated kline source.
pub struct PaginatedFetcher<S> {
    source: S,
    config: FetcherConfig,
}

impl<S: KlineSource> PaginatedFetcher<S> {
    pub fn new(source: S, config: FetcherConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every available candle in `[start_time, end_time]`.
    ///
    /// Returns `Ok(None)` when the transport fails (no response at all); any
    /// partially collected pages are discarded. An empty history yields an
    /// empty series.
    ///
    /// # Errors
    /// * `InvalidSymbol` when the source answers with code -1121
    /// * `FetchFailed` for any other non-success response
    /// * `Decode` when a page body is malformed
    pub async fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start_time: Option<NaiveDateTime>,
        end_time: Option<NaiveDateTime>,
    ) -> RegistryResult<Option<Series>> {
        let interval_ms = interval.duration_ms();
        let page_span_ms = i64::from(self.config.page_limit) * interval_ms;
        let lower_bound_ms = start_time.map(epoch_ms);

        let mut cursor = FetchCursor {
            end_time_ms: end_time.map(epoch_ms),
            start_time_ms: None,
        };
        let mut candles = Vec::new();
        let mut pages = 0usize;

        info!(
            symbol,
            %interval,
            start = ?start_time,
            end = ?end_time,
            "Fetching klines"
        );

        loop {
            if let (Some(lower), Some(end)) = (lower_bound_ms, cursor.end_time_ms) {
                if end < lower {
                    debug!(symbol, pages, "Cursor passed lower bound");
                    break;
                }
                // The next page reaches the bound: let the source clip there.
                if end - page_span_ms < lower {
                    cursor.start_time_ms = Some(lower);
                }
            }

            let request = PageRequest {
                symbol: symbol.to_string(),
                interval,
                limit: self.config.page_limit,
                start_time_ms: cursor.start_time_ms,
                end_time_ms: cursor.end_time_ms,
            };

            pages += 1;
            let page = match self.source.fetch_page(&request).await {
                Ok(page) => page,
                Err(SourceError::Transport(reason)) => {
                    warn!(symbol, %interval, pages, %reason, "Kline fetch abandoned");
                    return Ok(None);
                }
                Err(SourceError::Status { status, body }) => {
                    return Err(classify_failure(symbol, status, body));
                }
                Err(SourceError::Decode(reason)) => return Err(RegistryError::Decode(reason)),
            };

            let Some(oldest_ms) = page.iter().map(|c| c.open_time_ms()).min() else {
                break;
            };

            debug!(
                symbol,
                page = pages,
                count = page.len(),
                next_end_ms = oldest_ms - interval_ms,
                "Klines page received"
            );

            candles.extend(page);
            cursor.end_time_ms = Some(oldest_ms - interval_ms);
        }

        let series = Series::from_candles(candles);
        info!(
            symbol,
            %interval,
            pages,
            candles = series.len(),
            "Klines fetched"
        );
        Ok(Some(series))
    }
}

/// Map a non-success response onto a fatal error.
fn classify_failure(symbol: &str, status: u16, body: String) -> RegistryError {
    let code = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.code);

    if code == Some(INVALID_SYMBOL_CODE) {
        RegistryError::InvalidSymbol(symbol.to_string())
    } else {
        RegistryError::FetchFailed { status, body }
    }
}
