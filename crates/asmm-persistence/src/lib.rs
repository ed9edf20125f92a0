//! Data persistence for asmm.
//!
//! Stores one candle series per (symbol, interval) as a JSON Lines file and
//! writes simulation reports in the same format:
//! - Each line is a complete JSON object
//! - Files stay human-inspectable and diffable
//! - Floats round-trip exactly

pub mod error;
pub mod store;
pub mod writer;

pub use error::{PersistenceError, PersistenceResult};
pub use store::{JsonLinesSeriesStore, MemorySeriesStore, SeriesStore, StoreConfig};
pub use writer::JsonLinesWriter;
