//! Collaborator traits for the exchange endpoints.

use crate::error::SourceError;
use asmm_core::{Candle, Interval};
use std::future::Future;
use std::sync::Arc;

/// Parameters of one klines page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub symbol: String,
    pub interval: Interval,
    pub limit: u32,
    /// Inclusive lower bound, epoch ms.
    pub start_time_ms: Option<i64>,
    /// Inclusive upper bound, epoch ms.
    pub end_time_ms: Option<i64>,
}

/// Paginated candle endpoint.
pub trait KlineSource: Send + Sync {
    /// Fetch a single page. An empty page means no more history.
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Vec<Candle>, SourceError>> + Send;
}

/// Exchange metadata endpoint.
pub trait ExchangeInfoSource: Send + Sync {
    /// Fetch the raw exchangeInfo document.
    fn fetch_exchange_info(
        &self,
    ) -> impl Future<Output = Result<serde_json::Value, SourceError>> + Send;
}

impl<T: KlineSource> KlineSource for Arc<T> {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Vec<Candle>, SourceError>> + Send {
        (**self).fetch_page(request)
    }
}

impl<T: ExchangeInfoSource> ExchangeInfoSource for Arc<T> {
    fn fetch_exchange_info(
        &self,
    ) -> impl Future<Output = Result<serde_json::Value, SourceError>> + Send {
        (**self).fetch_exchange_info()
    }
}
