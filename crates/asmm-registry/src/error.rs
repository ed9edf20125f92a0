//! Registry error types.

use thiserror::Error;

/// Raw outcome of a single request, before the fetcher classifies it.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Connection-level failure; no response was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The source answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Fetch failed: HTTP {status}: {body}")]
    FetchFailed { status: u16, body: String },

    #[error("Symbol not found in exchange info: {0}")]
    SymbolNotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Core error: {0}")]
    Core(#[from] asmm_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
