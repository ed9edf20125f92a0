//! Error types for asmm-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown interval: {0}")]
    UnknownInterval(String),

    #[error("Timestamp out of range: {0}ms")]
    InvalidTimestamp(i64),

    #[error("Invalid candle: {0}")]
    InvalidCandle(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
