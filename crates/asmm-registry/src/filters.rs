//! Symbol filter lookup.
//!
//! Resolves quantity and price rounding precision from the exchangeInfo
//! `LOT_SIZE` and `PRICE_FILTER` filters. The full exchangeInfo document is
//! fetched once, written to a sentinel file in the data directory and read
//! from disk on every later run.
//!
//! Decimal places are counted on the normalized decimal string of the step
//! (`"0.00100000"` -> 3), never derived from a logarithm.

use crate::error::{RegistryError, RegistryResult, SourceError};
use crate::source::ExchangeInfoSource;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// File name of the cached exchangeInfo document.
pub const FILTER_CACHE_FILE: &str = "data_filter_all.json";

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: String,
    },
    #[serde(rename = "PRICE_FILTER")]
    PriceFilter {
        #[serde(rename = "tickSize")]
        tick_size: String,
    },
    #[serde(other)]
    Other,
}

/// Rounding precision for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPrecision {
    /// Quantity increment (`LOT_SIZE.stepSize`, 1 when absent).
    pub step_size: Decimal,
    /// Decimal places of `step_size`.
    pub qty_decimals: u32,
    /// Price increment (`PRICE_FILTER.tickSize`, 1 when absent).
    pub tick_size: Decimal,
    /// Decimal places of `tick_size`.
    pub price_decimals: u32,
}

impl SymbolPrecision {
    fn from_filters(filters: &[SymbolFilter]) -> RegistryResult<Self> {
        let mut step_size = Decimal::ONE;
        let mut tick_size = Decimal::ONE;

        for filter in filters {
            match filter {
                SymbolFilter::LotSize { step_size: s } => step_size = parse_step(s)?,
                SymbolFilter::PriceFilter { tick_size: t } => tick_size = parse_step(t)?,
                SymbolFilter::Other => {}
            }
        }

        Ok(Self {
            step_size,
            qty_decimals: decimals_from_step(step_size),
            tick_size,
            price_decimals: decimals_from_step(tick_size),
        })
    }
}

fn parse_step(raw: &str) -> RegistryResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| RegistryError::Decode(format!("invalid step size '{raw}': {e}")))
}

/// Count significant decimal places of a step size.
///
/// Steps of 1 or larger give 0.
pub fn decimals_from_step(step: Decimal) -> u32 {
    step.normalize().scale()
}

/// Disk-cached symbol filter lookup.
pub struct SymbolFilterCache<E> {
    source: E,
    cache_path: PathBuf,
    loaded: RwLock<Option<Arc<HashMap<String, SymbolPrecision>>>>,
}

impl<E: ExchangeInfoSource> SymbolFilterCache<E> {
    /// Create a lookup that caches exchangeInfo under `data_dir`.
    pub fn new(source: E, data_dir: impl AsRef<Path>) -> Self {
        Self {
            source,
            cache_path: data_dir.as_ref().join(FILTER_CACHE_FILE),
            loaded: RwLock::new(None),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Rounding precision for `symbol`.
    ///
    /// # Errors
    /// * `SymbolNotFound` when exchangeInfo does not list the symbol
    pub async fn precision(&self, symbol: &str) -> RegistryResult<SymbolPrecision> {
        let table = self.table().await?;
        table
            .get(symbol)
            .cloned()
            .ok_or_else(|| RegistryError::SymbolNotFound(symbol.to_string()))
    }

    async fn table(&self) -> RegistryResult<Arc<HashMap<String, SymbolPrecision>>> {
        let cached = self.loaded.read().clone();
        if let Some(table) = cached {
            return Ok(table);
        }

        let document = self.load_or_fetch().await?;
        let info: ExchangeInfo = serde_json::from_value(document)?;

        let mut table = HashMap::with_capacity(info.symbols.len());
        for entry in info.symbols {
            let precision = SymbolPrecision::from_filters(&entry.filters)?;
            table.insert(entry.symbol, precision);
        }
        debug!(symbols = table.len(), "Symbol filters loaded");

        let table = Arc::new(table);
        *self.loaded.write() = Some(Arc::clone(&table));
        Ok(table)
    }

    async fn load_or_fetch(&self) -> RegistryResult<serde_json::Value> {
        if self.cache_path.is_file() {
            debug!(path = %self.cache_path.display(), "Reading cached exchangeInfo");
            let raw = std::fs::read_to_string(&self.cache_path)?;
            return Ok(serde_json::from_str(&raw)?);
        }

        let document = self
            .source
            .fetch_exchange_info()
            .await
            .map_err(|e| match e {
                SourceError::Status { status, body } => RegistryError::FetchFailed { status, body },
                SourceError::Transport(reason) => RegistryError::HttpClient(reason),
                SourceError::Decode(reason) => RegistryError::Decode(reason),
            })?;

        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.cache_path, serde_json::to_string(&document)?)?;
        info!(path = %self.cache_path.display(), "Cached exchangeInfo");

        Ok(document)
    }
}
