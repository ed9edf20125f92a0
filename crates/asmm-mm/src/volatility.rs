//! Series preparation for the simulator.
//!
//! Rescales prices so the first open equals `price_base` and attaches a
//! rolling realized volatility: the sample std (n - 1) of the last
//! `vol_window` close-to-close returns, times `sqrt(vol_window × windows_per_day)`.
//! Rows without a full window of returns, or whose estimate is not finite
//! (a zero close makes the next return infinite), are dropped here, before
//! any simulation step runs.

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use asmm_core::Series;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Normalized candle with its volatility estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRow {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Raw traded volume, not rescaled.
    pub volume: f64,
    pub sigma: f64,
}

/// Close-to-close returns. The first entry has no predecessor.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(values.windows(2).map(|w| Some(w[1] / w[0] - 1.0)));
    out
}

/// Trailing sample standard deviation over `window` values.
///
/// An entry is `None` unless all `window` values ending there are defined.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|end| {
            if end + 1 < window {
                return None;
            }
            let slice = &values[end + 1 - window..=end];
            let mut sum = 0.0;
            for v in slice {
                sum += (*v)?;
            }
            let mean = sum / window as f64;
            let sq: f64 = slice
                .iter()
                .flatten()
                .map(|v| (v - mean) * (v - mean))
                .sum();
            Some((sq / (window - 1) as f64).sqrt())
        })
        .collect()
}

/// Scaled rolling volatility of `closes`.
pub fn realized_volatility(closes: &[f64], window: usize, windows_per_day: f64) -> Vec<Option<f64>> {
    let scale = (window as f64 * windows_per_day).sqrt();
    rolling_std(&pct_change(closes), window)
        .into_iter()
        .map(|s| s.map(|s| s * scale))
        .collect()
}

/// Normalize `series` and attach volatility, dropping warm-up rows.
///
/// # Errors
/// * `Config` for an unusable configuration
/// * `InvalidInput` when the first open cannot be used as a scale
pub fn prepare(series: &Series, config: &SimConfig) -> SimResult<Vec<SimRow>> {
    config.validate()?;

    let Some(first) = series.first() else {
        return Ok(Vec::new());
    };
    if !(first.open.is_finite() && first.open > 0.0) {
        return Err(SimError::InvalidInput(format!(
            "first open must be positive to normalize, got {}",
            first.open
        )));
    }
    let scale = config.price_base / first.open;

    let closes: Vec<f64> = series.iter().map(|c| c.close * scale).collect();
    let sigmas = realized_volatility(&closes, config.vol_window, config.windows_per_day);

    let rows: Vec<SimRow> = series
        .iter()
        .zip(sigmas)
        .filter_map(|(candle, sigma)| {
            Some(SimRow {
                time: candle.time,
                open: candle.open * scale,
                high: candle.high * scale,
                low: candle.low * scale,
                close: candle.close * scale,
                volume: candle.volume,
                sigma: sigma.filter(|s| s.is_finite())?,
            })
        })
        .collect();

    debug!(
        candles = series.len(),
        rows = rows.len(),
        dropped = series.len() - rows.len(),
        "Prepared simulation rows"
    );
    Ok(rows)
}
