//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,asmm=debug";

/// Whether `RUST_ENV` selects JSON output.
fn is_production(rust_env: Option<&str>) -> bool {
    rust_env == Some("production")
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. With `RUST_ENV=production` every
/// event is one JSON object per line.
///
/// # Errors
/// `LoggingInit` if a global subscriber is already installed.
pub fn init_logging() -> TelemetryResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let rust_env = std::env::var("RUST_ENV").ok();

    let result = if is_production(rust_env.as_deref()) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
