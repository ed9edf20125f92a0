//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed error: {0}")]
    Feed(#[from] asmm_feed::FeedError),

    #[error("Registry error: {0}")]
    Registry(#[from] asmm_registry::RegistryError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] asmm_mm::SimError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] asmm_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] asmm_persistence::PersistenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
