//! Single-asset market making simulator.
//!
//! Replays a candle series against an Avellaneda-Stoikov quoter:
//! - Series preparation: price normalization and rolling realized volatility
//! - Quote calculation: reservation price and optimal spread
//! - Fill matching against each bar's low/high
//! - Cash and inventory bookkeeping with mark-to-market PnL
//!
//! # Architecture
//!
//! ```text
//! Series → prepare() → [SimRow]
//!                        ↓
//!          Simulator.run()
//!            ├─ compute_quote(): r, δ, bid/ask
//!            ├─ match_fills(): bid >= low, ask <= high
//!            └─ Book.record_fill(): cash/inventory
//!                        ↓
//!                 SimulationReport
//! ```

pub mod config;
pub mod error;
pub mod inventory;
pub mod quote_engine;
pub mod simulator;
pub mod volatility;

pub use config::SimConfig;
pub use error::{QuoteError, SimError, SimResult};
pub use inventory::Book;
pub use quote_engine::{compute_quote, Quote, QuoteInputs};
pub use simulator::{match_fills, FillDecision, FillRecord, SimulationReport, Simulator, StepRecord};
pub use volatility::{pct_change, prepare, realized_volatility, rolling_std, SimRow};
