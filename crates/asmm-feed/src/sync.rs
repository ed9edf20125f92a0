//! Cache synchronizer.
//!
//! `get_data` loads the cached series for a key and decides between three
//! paths:
//! - missing: full history walk, persisted as-is
//! - stale (newest candle older than the freshness threshold): fetch from
//!   the newest cached candle onward, merge, persist
//! - fresh: returned untouched
//!
//! A transport failure during a refresh keeps the stale series. Date filters
//! are applied to a copy after the cache is settled, never to what is stored.

use crate::error::{FeedError, FeedResult};
use asmm_core::{Clock, Interval, Series, SeriesKey};
use asmm_persistence::SeriesStore;
use asmm_registry::{KlineSource, PaginatedFetcher};
use chrono::{Duration, NaiveDateTime};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Synchronizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum age of the newest cached candle before a refresh (seconds).
    /// Applies to every interval alike.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,
}

fn default_freshness_secs() -> u64 {
    3600
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness_secs(),
        }
    }
}

impl SyncConfig {
    pub fn freshness(&self) -> Duration {
        // chrono caps durations at i64::MAX milliseconds.
        let secs = self.freshness_secs.min(i64::MAX as u64 / 1000);
        Duration::seconds(secs as i64)
    }
}

/// Keeps persisted series fresh.
pub struct CacheSynchronizer<K, S, C> {
    fetcher: PaginatedFetcher<K>,
    store: S,
    clock: C,
    config: SyncConfig,
    /// Serializes refreshes of the same key.
    key_locks: DashMap<SeriesKey, Arc<Mutex<()>>>,
    /// Wall-clock time of the last successful refresh per key.
    last_refresh: DashMap<SeriesKey, NaiveDateTime>,
}

impl<K, S, C> CacheSynchronizer<K, S, C>
where
    K: KlineSource,
    S: SeriesStore,
    C: Clock,
{
    pub fn new(fetcher: PaginatedFetcher<K>, store: S, clock: C, config: SyncConfig) -> Self {
        Self {
            fetcher,
            store,
            clock,
            config,
            key_locks: DashMap::new(),
            last_refresh: DashMap::new(),
        }
    }

    pub fn fetcher(&self) -> &PaginatedFetcher<K> {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fresh series for `(symbol, interval)`, optionally cut to
    /// `start_date <= time <= end_date`.
    ///
    /// # Errors
    /// * `Registry` for fatal fetch errors (invalid symbol, failed request)
    /// * `CacheIo` when the store cannot be read or written
    /// * `Unavailable` when nothing is cached and the source is unreachable
    pub async fn get_data(
        &self,
        symbol: &str,
        interval: Interval,
        start_date: Option<NaiveDateTime>,
        end_date: Option<NaiveDateTime>,
    ) -> FeedResult<Series> {
        let key = SeriesKey::new(symbol, interval);

        let lock = Arc::clone(self.key_locks.entry(key.clone()).or_default().value());
        let _guard = lock.lock().await;

        let series = self.synchronize(&key).await?;

        if start_date.is_none() && end_date.is_none() {
            return Ok(series);
        }
        let view = series.slice(start_date, end_date);
        debug!(%key, cached = series.len(), returned = view.len(), "Applied date filter");
        Ok(view)
    }

    /// `get_data` for several symbols, one after another.
    pub async fn get_data_for_symbols<T: AsRef<str>>(
        &self,
        symbols: &[T],
        interval: Interval,
        start_date: Option<NaiveDateTime>,
        end_date: Option<NaiveDateTime>,
    ) -> FeedResult<BTreeMap<String, Series>> {
        let mut out = BTreeMap::new();
        for symbol in symbols {
            let symbol = symbol.as_ref();
            let series = self
                .get_data(symbol, interval, start_date, end_date)
                .await?;
            out.insert(symbol.to_string(), series);
        }
        Ok(out)
    }

    async fn synchronize(&self, key: &SeriesKey) -> FeedResult<Series> {
        let loaded = self.store.load(key)?;
        let now = self.clock.now();
        let threshold = self.config.freshness();

        let cached = match loaded {
            Some(series) if !series.is_empty() => Some(series),
            Some(empty) if self.refreshed_within(key, now, threshold) => {
                debug!(%key, "Refreshed within threshold, source has no history yet");
                return Ok(empty);
            }
            _ => None,
        };

        let Some(cached) = cached else {
            info!(%key, "No cached data, fetching full history");
            let fetched = self
                .fetcher
                .fetch(&key.symbol, key.interval, None, None)
                .await?
                .ok_or_else(|| FeedError::Unavailable(key.to_string()))?;
            self.store.save(key, &fetched)?;
            self.last_refresh.insert(key.clone(), now);
            return Ok(fetched);
        };

        let Some(last_time) = cached.last_time() else {
            return Ok(cached);
        };
        let age = now - last_time;

        if age <= threshold {
            debug!(%key, %last_time, age_secs = age.num_seconds(), "Cached data is fresh");
            return Ok(cached);
        }

        if self.refreshed_within(key, now, threshold) {
            debug!(%key, "Refreshed within threshold, source has nothing newer");
            return Ok(cached);
        }

        info!(%key, %last_time, age_secs = age.num_seconds(), "Cached data is outdated, fetching suffix");

        match self
            .fetcher
            .fetch(&key.symbol, key.interval, Some(last_time), None)
            .await?
        {
            Some(suffix) => {
                let before = cached.len();
                let merged = cached.merge(suffix);
                self.store.save(key, &merged)?;
                self.last_refresh.insert(key.clone(), now);
                info!(%key, added = merged.len() - before, total = merged.len(), "Cache refreshed");
                Ok(merged)
            }
            None => {
                warn!(%key, %last_time, "Refresh failed, serving stale data");
                Ok(cached)
            }
        }
    }

    fn refreshed_within(&self, key: &SeriesKey, now: NaiveDateTime, threshold: Duration) -> bool {
        self.last_refresh
            .get(key)
            .is_some_and(|refreshed_at| now - *refreshed_at <= threshold)
    }
}
