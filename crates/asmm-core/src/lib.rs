//! Core domain types for the asmm candle cache and simulator.
//!
//! This crate provides the types shared by every other crate:
//! - `Candle`, `Series`: OHLCV bars and ascending, deduplicated runs of them
//! - `SeriesKey`: the (symbol, interval) pair a series is cached under
//! - `Interval`: the Binance timeframe catalog
//! - `Clock`: injectable wall clock
//! - `Side`: fill direction

pub mod candle;
pub mod clock;
pub mod error;
pub mod interval;
pub mod side;

pub use candle::{Candle, Series, SeriesKey};
pub use clock::{epoch_ms, from_epoch_ms, Clock, FixedClock, SystemClock};
pub use error::{CoreError, Result};
pub use interval::{duration_seconds, Interval};
pub use side::Side;
