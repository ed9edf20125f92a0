//! Candle cache synchronization for asmm.
//!
//! Keeps each persisted (symbol, interval) series fresh with minimal
//! re-downloading: a missing cache triggers one full backward walk, a stale
//! cache triggers a fetch of only the missing suffix which is merged in.

pub mod error;
pub mod sync;

pub use error::{FeedError, FeedResult};
pub use sync::{CacheSynchronizer, SyncConfig};
