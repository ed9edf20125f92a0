//! Cash and inventory bookkeeping.
//!
//! Every fill is one unit at the quoted price. Cash starts at zero, so
//! `cash + inventory × mid` is the running mark-to-market PnL.

use asmm_core::Side;

/// Single-asset book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    /// Cash balance (negative after net buying).
    pub cash: f64,
    /// Net position in units (positive = long, negative = short).
    pub inventory: i64,
    /// Total number of fills processed.
    pub fill_count: u64,
    pub buy_count: u64,
    pub sell_count: u64,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a one-unit fill.
    pub fn record_fill(&mut self, side: Side, price: f64) {
        match side {
            Side::Buy => {
                self.cash -= price;
                self.buy_count += 1;
            }
            Side::Sell => {
                self.cash += price;
                self.sell_count += 1;
            }
        }
        self.inventory += side.sign();
        self.fill_count += 1;
    }

    /// `cash + inventory × mid`.
    pub fn mark_to_market(&self, mid: f64) -> f64 {
        self.cash + self.inventory as f64 * mid
    }

    pub fn is_flat(&self) -> bool {
        self.inventory == 0
    }
}
