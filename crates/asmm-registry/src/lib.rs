//! Exchange data acquisition for asmm.
//!
//! Walks the Binance klines endpoint backward page by page and resolves
//! per-symbol rounding precision from a disk-cached exchangeInfo document.
//! The HTTP client sits behind the `KlineSource` and `ExchangeInfoSource`
//! traits so pagination can be driven by scripted sources in tests.

pub mod client;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod source;

pub use client::{BinanceClient, DEFAULT_REST_URL};
pub use error::{RegistryError, RegistryResult, SourceError};
pub use fetcher::{FetcherConfig, PaginatedFetcher};
pub use filters::{decimals_from_step, SymbolFilterCache, SymbolPrecision, FILTER_CACHE_FILE};
pub use source::{ExchangeInfoSource, KlineSource, PageRequest};
