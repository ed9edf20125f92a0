//! Candle cache and Avellaneda-Stoikov simulation runner.
//!
//! Wires the pieces together for one run:
//! - Binance REST client and paginated fetcher
//! - JSON Lines candle cache kept fresh by the synchronizer
//! - Series preparation and the market making simulation
//! - JSON Lines step report

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, BinanceApplication};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
