//! Simulator error types.

use thiserror::Error;

/// Arithmetic domain violations in the quoting model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuoteError {
    #[error("risk aversion must be positive, got {0}")]
    NonPositiveRiskAversion(f64),

    #[error("depth parameter must be positive, got {0}")]
    NonPositiveDepth(f64),

    #[error("log argument 1 + gamma/k must be positive, got {0}")]
    LogDomain(f64),

    #[error("{name} is not finite: {value}")]
    NonFinite { name: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Simulation domain error at step {step}: {source}")]
    Domain { step: usize, source: QuoteError },

    #[error("Invalid input series: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type SimResult<T> = Result<T, SimError>;
