//! Structured logging for asmm.
//!
//! JSON lines in production, pretty output otherwise.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
