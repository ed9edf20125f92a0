//! Candle cache and Avellaneda-Stoikov simulation - Entry Point

use anyhow::Result;
use asmm_core::{Clock, Interval, SystemClock};
use clap::Parser;
use tracing::info;

/// Avellaneda-Stoikov market making simulation over cached Binance candles
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ASMM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Trading pair, overrides the config file
    #[arg(short, long)]
    symbol: Option<String>,

    /// Candle interval label (e.g. 1m, 1h), overrides the config file
    #[arg(short, long)]
    interval: Option<Interval>,

    /// Hours of history to simulate, overrides the config file
    #[arg(short, long)]
    lookback_hours: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    asmm_telemetry::init_logging()?;

    info!("Starting asmm-sim v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > ASMM_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("ASMM_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let mut config = asmm_bot::AppConfig::load(&config_path)?;
    if let Some(symbol) = args.symbol {
        config.symbol = symbol;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(hours) = args.lookback_hours {
        config.lookback_hours = hours;
    }
    info!(symbol = %config.symbol, interval = %config.interval, rest_url = %config.rest_url, "Configuration loaded");

    let app = asmm_bot::BinanceApplication::new(config)?;
    let (report, _) = app.run(SystemClock.now()).await?;

    info!(profit = report.profit, "Done");

    Ok(())
}
