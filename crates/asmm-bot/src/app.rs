//! Run orchestration.
//!
//! One run brings the configured series up to date, prepares it, replays the
//! market maker over it and writes the per-step report.

use crate::config::AppConfig;
use crate::error::AppResult;
use asmm_core::{Clock, Series, SystemClock};
use asmm_feed::CacheSynchronizer;
use asmm_mm::{SimulationReport, Simulator, StepRecord};
use asmm_persistence::{JsonLinesSeriesStore, JsonLinesWriter, SeriesStore};
use asmm_registry::{
    BinanceClient, ExchangeInfoSource, KlineSource, PaginatedFetcher, SymbolFilterCache,
};
use chrono::{Duration, NaiveDateTime};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Report records buffered before each write.
const REPORT_BUFFER_SIZE: usize = 500;

/// Application backed by the live Binance API and the on-disk cache.
pub type BinanceApplication =
    Application<Arc<BinanceClient>, Arc<BinanceClient>, JsonLinesSeriesStore, SystemClock>;

/// Main application.
pub struct Application<K, E, S, C> {
    config: AppConfig,
    synchronizer: CacheSynchronizer<K, S, C>,
    filters: SymbolFilterCache<E>,
    simulator: Simulator,
}

impl BinanceApplication {
    /// Create the live application.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = Arc::new(BinanceClient::new(config.rest_url.clone())?);
        let store = JsonLinesSeriesStore::new(&config.store);
        Self::with_components(config, Arc::clone(&client), client, store, SystemClock)
    }
}

impl<K, E, S, C> Application<K, E, S, C>
where
    K: KlineSource,
    E: ExchangeInfoSource,
    S: SeriesStore,
    C: Clock,
{
    /// Assemble the application from explicit collaborators.
    pub fn with_components(
        config: AppConfig,
        klines: K,
        exchange_info: E,
        store: S,
        clock: C,
    ) -> AppResult<Self> {
        config.validate()?;

        let fetcher = PaginatedFetcher::new(klines, config.fetcher.clone());
        let synchronizer = CacheSynchronizer::new(fetcher, store, clock, config.sync.clone());
        let filters = SymbolFilterCache::new(exchange_info, &config.store.data_dir);
        let simulator = Simulator::new(config.sim.clone())?;

        Ok(Self {
            config,
            synchronizer,
            filters,
            simulator,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetch, simulate and report.
    ///
    /// Returns the report and the path of the step records.
    pub async fn run(&self, now: NaiveDateTime) -> AppResult<(SimulationReport, PathBuf)> {
        let symbol = &self.config.symbol;
        let interval = self.config.interval;

        info!(%symbol, %interval, lookback_hours = self.config.lookback_hours, "Starting run");

        self.log_precision().await;

        let series = self.load_series(now).await?;
        if let (Some(first), Some(last)) = (series.first(), series.last()) {
            info!(candles = series.len(), first = %first.time, last = %last.time, "Series ready");
        } else {
            warn!(%symbol, "No candles in lookback window");
        }

        let report = self.simulator.run_series(&series)?;
        let path = self.write_report(&report.steps, now)?;

        info!(
            steps = report.steps.len(),
            fills = report.fills.len(),
            final_cash = report.final_cash,
            final_inventory = report.final_inventory,
            profit = report.profit,
            report = %path.display(),
            "Run summary"
        );

        Ok((report, path))
    }

    /// Cached series covering the lookback window ending at `now`.
    async fn load_series(&self, now: NaiveDateTime) -> AppResult<Series> {
        let start = now - Duration::hours(i64::from(self.config.lookback_hours));
        let series = self
            .synchronizer
            .get_data(&self.config.symbol, self.config.interval, Some(start), None)
            .await?;
        Ok(series)
    }

    /// Informational only; a failed lookup never aborts the run.
    async fn log_precision(&self) {
        match self.filters.precision(&self.config.symbol).await {
            Ok(p) => info!(
                symbol = %self.config.symbol,
                qty_decimals = p.qty_decimals,
                tick_size = %p.tick_size,
                price_decimals = p.price_decimals,
                "Symbol precision"
            ),
            Err(e) => warn!(symbol = %self.config.symbol, error = %e, "Symbol precision unavailable"),
        }
    }

    fn report_path(&self, now: NaiveDateTime) -> PathBuf {
        self.config.report_dir.join(format!(
            "report_{}_{}_{}.jsonl",
            self.config.symbol,
            self.config.interval,
            now.format("%Y%m%dT%H%M%S")
        ))
    }

    fn write_report(&self, steps: &[StepRecord], now: NaiveDateTime) -> AppResult<PathBuf> {
        let path = self.report_path(now);
        let mut writer = JsonLinesWriter::open(&path, REPORT_BUFFER_SIZE)?;
        for step in steps {
            writer.add_record(step.clone())?;
        }
        writer.close()?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asmm_core::{Candle, FixedClock, Interval};
    use asmm_persistence::{MemorySeriesStore, StoreConfig};
    use asmm_registry::{PageRequest, SourceError};
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::io::BufRead;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(minute: i64) -> Candle {
        let open = 1.6 + 0.01 * (minute as f64 / 7.0).sin();
        let close = 1.6 + 0.01 * ((minute + 1) as f64 / 7.0).sin();
        Candle::new(
            t0() + Duration::minutes(minute),
            open,
            open.max(close) * 1.004,
            open.min(close) * 0.996,
            close,
            300.0,
        )
    }

    /// Thirteen hours of one-minute candles, newest window first.
    struct MarketSource;

    impl KlineSource for MarketSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Candle>, SourceError> {
            let all: Vec<Candle> = (0..13 * 60)
                .map(bar)
                .filter(|c| request.start_time_ms.map_or(true, |s| c.open_time_ms() >= s))
                .filter(|c| request.end_time_ms.map_or(true, |e| c.open_time_ms() <= e))
                .collect();
            let skip = all.len().saturating_sub(request.limit as usize);
            Ok(all.into_iter().skip(skip).collect())
        }
    }

    struct ExchangeInfo(Option<Value>);

    impl ExchangeInfoSource for ExchangeInfo {
        async fn fetch_exchange_info(&self) -> Result<Value, SourceError> {
            self.0
                .clone()
                .ok_or_else(|| SourceError::Transport("offline".to_string()))
        }
    }

    fn config(dir: &TempDir) -> AppConfig {
        AppConfig {
            symbol: "SUIUSDT".to_string(),
            interval: Interval::Minute1,
            lookback_hours: 10,
            report_dir: dir.path().join("reports"),
            store: StoreConfig {
                data_dir: dir.path().to_path_buf(),
            },
            ..Default::default()
        }
    }

    fn app(
        dir: &TempDir,
        info: Option<Value>,
    ) -> Application<MarketSource, ExchangeInfo, MemorySeriesStore, Arc<FixedClock>> {
        let now = t0() + Duration::hours(13);
        Application::with_components(
            config(dir),
            MarketSource,
            ExchangeInfo(info),
            MemorySeriesStore::new(),
            Arc::new(FixedClock::new(now)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_simulates_lookback_window() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None);
        let now = t0() + Duration::hours(13);

        let (report, path) = assert_ok!(app.run(now).await);

        // 10h window is 600 candles, minus 12 warm-up rows and the reference row.
        assert_eq!(report.steps.len(), 600 - 12 - 1);
        assert_eq!(report.steps[0].time, t0() + Duration::hours(3) + Duration::minutes(13));

        let lines = std::io::BufReader::new(std::fs::File::open(&path).unwrap())
            .lines()
            .count();
        assert_eq!(lines, report.steps.len());
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("report_SUIUSDT_1m_"));
    }

    #[tokio::test]
    async fn test_run_with_exchange_info_caches_filters() {
        let dir = TempDir::new().unwrap();
        let info = json!({
            "symbols": [{
                "symbol": "SUIUSDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "tickSize": "0.00010000"},
                    {"filterType": "LOT_SIZE", "stepSize": "0.10000000"}
                ]
            }]
        });
        let app = app(&dir, Some(info));

        app.run(t0() + Duration::hours(13)).await.unwrap();
        assert!(dir.path().join("data_filter_all.json").exists());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let mut bad = config(&dir);
        bad.symbol = String::new();

        let result = Application::with_components(
            bad,
            MarketSource,
            ExchangeInfo(None),
            MemorySeriesStore::new(),
            Arc::new(FixedClock::new(t0())),
        );
        assert!(result.is_err());
    }
}
