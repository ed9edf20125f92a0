//! Simulator configuration.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Avellaneda-Stoikov simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Total horizon `T`; time fractions run from 0 towards it.
    #[serde(default = "default_horizon")]
    pub horizon: f64,

    /// Risk aversion `γ`.
    #[serde(default = "default_risk_aversion")]
    pub risk_aversion: f64,

    /// Use `volume_sensitivity × volume` as the depth parameter `k` each step.
    /// When false the static `depth_param` is used instead.
    #[serde(default = "default_true")]
    pub volume_depth: bool,

    /// Static depth parameter `k`.
    #[serde(default = "default_depth_param")]
    pub depth_param: f64,

    /// Volume multiplier `α` for the per-step depth parameter.
    #[serde(default = "default_volume_sensitivity")]
    pub volume_sensitivity: f64,

    /// Close returns per rolling volatility window.
    #[serde(default = "default_vol_window")]
    pub vol_window: usize,

    /// Volatility windows per day; with `vol_window` it scales the window
    /// std by `sqrt(vol_window × windows_per_day)`.
    #[serde(default = "default_windows_per_day")]
    pub windows_per_day: f64,

    /// Value the first open is rescaled to.
    #[serde(default = "default_price_base")]
    pub price_base: f64,

    /// Allow a buy and a sell fill in the same bar.
    /// When false and both sides touch, only the side that reduces the
    /// absolute inventory fills (none when flat).
    #[serde(default = "default_true")]
    pub allow_double_fill: bool,
}

fn default_horizon() -> f64 {
    1.0
}

fn default_risk_aversion() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_depth_param() -> f64 {
    1.5
}

fn default_volume_sensitivity() -> f64 {
    0.1
}

fn default_vol_window() -> usize {
    12
}

fn default_windows_per_day() -> f64 {
    288.0
}

fn default_price_base() -> f64 {
    100.0
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            risk_aversion: default_risk_aversion(),
            volume_depth: default_true(),
            depth_param: default_depth_param(),
            volume_sensitivity: default_volume_sensitivity(),
            vol_window: default_vol_window(),
            windows_per_day: default_windows_per_day(),
            price_base: default_price_base(),
            allow_double_fill: default_true(),
        }
    }
}

impl SimConfig {
    /// Annualization factor applied to the rolling std.
    pub fn volatility_scale(&self) -> f64 {
        (self.vol_window as f64 * self.windows_per_day).sqrt()
    }

    /// Reject parameters that can never produce a valid run.
    ///
    /// `risk_aversion` and the depth parameter are checked per step by the
    /// quote engine so the failing step can be reported.
    pub fn validate(&self) -> SimResult<()> {
        if self.vol_window < 2 {
            return Err(SimError::Config(format!(
                "vol_window must be at least 2, got {}",
                self.vol_window
            )));
        }
        if !(self.windows_per_day.is_finite() && self.windows_per_day > 0.0) {
            return Err(SimError::Config(format!(
                "windows_per_day must be positive, got {}",
                self.windows_per_day
            )));
        }
        if !(self.price_base.is_finite() && self.price_base > 0.0) {
            return Err(SimError::Config(format!(
                "price_base must be positive, got {}",
                self.price_base
            )));
        }
        if !self.horizon.is_finite() {
            return Err(SimError::Config(format!(
                "horizon must be finite, got {}",
                self.horizon
            )));
        }
        Ok(())
    }
}
