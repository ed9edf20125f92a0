//! Application configuration.

use crate::error::{AppError, AppResult};
use asmm_core::Interval;
use asmm_feed::SyncConfig;
use asmm_mm::SimConfig;
use asmm_persistence::StoreConfig;
use asmm_registry::{FetcherConfig, DEFAULT_REST_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Binance REST root.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// Trading pair, e.g. "SUIUSDT".
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    /// History simulated, ending now.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    /// Directory for step reports.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

fn default_rest_url() -> String {
    DEFAULT_REST_URL.to_string()
}

fn default_symbol() -> String {
    "SUIUSDT".to_string()
}

fn default_interval() -> Interval {
    Interval::Minute1
}

fn default_lookback_hours() -> u32 {
    10
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("data/reports")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            symbol: default_symbol(),
            interval: default_interval(),
            lookback_hours: default_lookback_hours(),
            report_dir: default_report_dir(),
            store: StoreConfig::default(),
            fetcher: FetcherConfig::default(),
            sync: SyncConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or defaults when the file does not exist.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(AppError::Config("symbol must not be empty".to_string()));
        }
        if self.fetcher.page_limit == 0 {
            return Err(AppError::Config("fetcher.page_limit must be positive".to_string()));
        }
        self.sim
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.symbol, "SUIUSDT");
        assert_eq!(config.interval, Interval::Minute1);
        assert_eq!(config.lookback_hours, 10);
        assert_eq!(config.sync.freshness_secs, 3600);
        assert_eq!(config.fetcher.page_limit, 1000);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml() {
        let toml_str = r#"
            symbol = "BTCUSDT"
            interval = "5m"

            [sim]
            risk_aversion = 0.2

            [store]
            data_dir = "/tmp/candles"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.interval, Interval::Minute5);
        assert_eq!(config.sim.risk_aversion, 0.2);
        assert_eq!(config.sim.vol_window, 12);
        assert_eq!(config.store.data_dir, PathBuf::from("/tmp/candles"));
        assert_eq!(config.rest_url, DEFAULT_REST_URL);
    }

    #[test]
    fn test_unknown_interval_rejected() {
        assert!(toml::from_str::<AppConfig>(r#"interval = "7m""#).is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/asmm.toml").unwrap();
        assert_eq!(config.symbol, "SUIUSDT");
    }

    #[test]
    fn test_from_file_validates() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sim]\nvol_window = 1").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert!(matches!(AppConfig::from_file(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = toml::to_string(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("symbol"));
        assert!(toml_str.contains("[sim]"));
    }
}
