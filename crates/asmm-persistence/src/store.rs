//! Series stores.
//!
//! `JsonLinesSeriesStore` keeps `data_{symbol}_{interval}.jsonl` files under a
//! data directory, one candle per line, ascending by time. Saves go through a
//! temporary file and a rename, so a reader never sees a half-written series.

use crate::error::{PersistenceError, PersistenceResult};
use asmm_core::{Candle, Series, SeriesKey};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persists and retrieves one series per key.
pub trait SeriesStore: Send + Sync {
    /// Load the cached series. `Ok(None)` when nothing was saved yet.
    fn load(&self, key: &SeriesKey) -> PersistenceResult<Option<Series>>;

    /// Replace the cached series.
    fn save(&self, key: &SeriesKey, series: &Series) -> PersistenceResult<()>;
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the cache files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// File-backed JSON Lines store.
#[derive(Debug, Clone)]
pub struct JsonLinesSeriesStore {
    data_dir: PathBuf,
}

impl JsonLinesSeriesStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Cache file for a key.
    pub fn path_for(&self, key: &SeriesKey) -> PathBuf {
        self.data_dir
            .join(format!("data_{}_{}.jsonl", key.symbol, key.interval))
    }
}

impl SeriesStore for JsonLinesSeriesStore {
    fn load(&self, key: &SeriesKey) -> PersistenceResult<Option<Series>> {
        let path = self.path_for(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%key, path = %path.display(), "No cached series");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut candles = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let candle: Candle =
                serde_json::from_str(&line).map_err(|e| PersistenceError::Corrupt {
                    path: path.clone(),
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            candle.validate().map_err(|e| PersistenceError::Corrupt {
                path: path.clone(),
                line: idx + 1,
                reason: e.to_string(),
            })?;
            candles.push(candle);
        }

        let series = Series::from_candles(candles);
        debug!(%key, candles = series.len(), "Loaded cached series");
        Ok(Some(series))
    }

    fn save(&self, key: &SeriesKey, series: &Series) -> PersistenceResult<()> {
        fs::create_dir_all(&self.data_dir)?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("jsonl.tmp");

        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for candle in series {
                let json = serde_json::to_string(candle)?;
                writeln!(writer, "{}", json)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;

        info!(
            %key,
            path = %path.display(),
            candles = series.len(),
            "Saved series"
        );
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemorySeriesStore {
    series: Mutex<HashMap<SeriesKey, Series>>,
    saves: Mutex<usize>,
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one series.
    pub fn with_series(key: SeriesKey, series: Series) -> Self {
        let store = Self::new();
        store.series.lock().insert(key, series);
        store
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    pub fn get(&self, key: &SeriesKey) -> Option<Series> {
        self.series.lock().get(key).cloned()
    }
}

impl SeriesStore for MemorySeriesStore {
    fn load(&self, key: &SeriesKey) -> PersistenceResult<Option<Series>> {
        Ok(self.get(key))
    }

    fn save(&self, key: &SeriesKey, series: &Series) -> PersistenceResult<()> {
        self.series.lock().insert(key.clone(), series.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asmm_core::Interval;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn t(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn sample_series() -> Series {
        Series::from_candles(
            (0..50)
                .map(|m| {
                    // Awkward binary fractions on purpose.
                    let px = 1.0 / 3.0 + m as f64 * 0.1;
                    Candle::new(t(m), px, px + 0.07, px - 0.03, px + 0.01, 1234.5678 + m as f64)
                })
                .collect(),
        )
    }

    fn store(dir: &TempDir) -> JsonLinesSeriesStore {
        JsonLinesSeriesStore::new(&StoreConfig {
            data_dir: dir.path().to_path_buf(),
        })
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let key = SeriesKey::new("SUIUSDT", Interval::Minute1);
        assert!(store(&dir).load(&key).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_is_exact() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = SeriesKey::new("SUIUSDT", Interval::Minute1);
        let series = sample_series();

        store.save(&key, &series).unwrap();
        let loaded = store.load(&key).unwrap().unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = SeriesKey::new("SOLUSDT", Interval::Hour1);
        store.save(&key, &sample_series()).unwrap();

        let path = dir.path().join("data_SOLUSDT_1h.jsonl");
        assert_eq!(store.path_for(&key), path);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 50);
        assert!(lines[0].contains("\"time\":\"2024-05-01T08:00:00\""));
        assert!(!dir.path().join("data_SOLUSDT_1h.jsonl.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = SeriesKey::new("SUIUSDT", Interval::Minute1);

        store.save(&key, &sample_series()).unwrap();
        let shorter = sample_series().slice(None, Some(t(9)));
        store.save(&key, &shorter).unwrap();

        assert_eq!(store.load(&key).unwrap().unwrap().len(), 10);
    }

    #[test]
    fn test_corrupt_line_reported() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = SeriesKey::new("SUIUSDT", Interval::Minute1);
        store.save(&key, &sample_series()).unwrap();

        let path = store.path_for(&key);
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{not json}\n");
        fs::write(&path, content).unwrap();

        match store.load(&key) {
            Err(PersistenceError::Corrupt { line, .. }) => assert_eq!(line, 51),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_inconsistent_candle_reported() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = SeriesKey::new("SUIUSDT", Interval::Minute1);

        // High below low.
        let broken = Candle::new(t(0), 2.0, 1.0, 3.0, 2.0, 5.0);
        let line = serde_json::to_string(&broken).unwrap();
        fs::write(store.path_for(&key), format!("{line}\n")).unwrap();

        match store.load(&key) {
            Err(PersistenceError::Corrupt { line, reason, .. }) => {
                assert_eq!(line, 1);
                assert!(reason.contains("OHLC"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = SeriesKey::new("SUIUSDT", Interval::Minute1);
        // A directory where the file should be.
        fs::create_dir_all(store.path_for(&key)).unwrap();
        assert!(store.load(&key).is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySeriesStore::new();
        let key = SeriesKey::new("SUIUSDT", Interval::Minute1);
        assert!(store.load(&key).unwrap().is_none());

        store.save(&key, &sample_series()).unwrap();
        assert_eq!(store.load(&key).unwrap().unwrap(), sample_series());
        assert_eq!(store.save_count(), 1);
    }
}
