//! Avellaneda-Stoikov quote calculation.
//!
//! - Reservation price: `r = s − q·γ·σ²·(T − t)`
//! - Optimal spread: `δ = γ·σ²·(T − t) + (2/γ)·ln(1 + γ/k)`
//! - Quotes: `bid = r − δ/2`, `ask = r + δ/2`
//!
//! A long inventory (`q > 0`) pulls both quotes down so sells fill more
//! easily; a short inventory pushes them up.

use crate::error::QuoteError;
use serde::{Deserialize, Serialize};

/// Model inputs for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteInputs {
    /// Mid price `s`.
    pub mid: f64,
    /// Signed inventory `q`.
    pub inventory: i64,
    /// Volatility estimate `σ`.
    pub sigma: f64,
    /// Elapsed fraction of the horizon `t`.
    pub time_fraction: f64,
    /// Total horizon `T`.
    pub horizon: f64,
    /// Risk aversion `γ`.
    pub risk_aversion: f64,
    /// Order book depth parameter `k`.
    pub depth_param: f64,
}

/// Quote state for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub reservation_price: f64,
    /// Full spread `δ`.
    pub spread: f64,
    /// `δ / 2`.
    pub half_spread: f64,
    pub bid: f64,
    pub ask: f64,
}

/// Compute reservation price, spread and quotes.
///
/// # Errors
/// Any input that would make the spread undefined or non-finite.
pub fn compute_quote(inputs: &QuoteInputs) -> Result<Quote, QuoteError> {
    let QuoteInputs {
        mid,
        inventory,
        sigma,
        time_fraction,
        horizon,
        risk_aversion: gamma,
        depth_param: k,
    } = *inputs;

    for (name, value) in [
        ("mid", mid),
        ("sigma", sigma),
        ("time_fraction", time_fraction),
        ("horizon", horizon),
        ("risk_aversion", gamma),
        ("depth_param", k),
    ] {
        if !value.is_finite() {
            return Err(QuoteError::NonFinite { name, value });
        }
    }
    if gamma <= 0.0 {
        return Err(QuoteError::NonPositiveRiskAversion(gamma));
    }
    if k <= 0.0 {
        return Err(QuoteError::NonPositiveDepth(k));
    }
    let log_arg = 1.0 + gamma / k;
    if log_arg <= 0.0 {
        return Err(QuoteError::LogDomain(log_arg));
    }

    let remaining = horizon - time_fraction;
    let inventory_risk = gamma * sigma * sigma * remaining;

    let reservation_price = mid - inventory as f64 * inventory_risk;
    let spread = inventory_risk + (2.0 / gamma) * log_arg.ln();
    let half_spread = spread / 2.0;

    if !reservation_price.is_finite() {
        return Err(QuoteError::NonFinite {
            name: "reservation_price",
            value: reservation_price,
        });
    }
    if !spread.is_finite() {
        return Err(QuoteError::NonFinite {
            name: "spread",
            value: spread,
        });
    }

    Ok(Quote {
        reservation_price,
        spread,
        half_spread,
        bid: reservation_price - half_spread,
        ask: reservation_price + half_spread,
    })
}
