//! Step-by-step market making simulation.
//!
//! Row 0 of the prepared series is reference-only. For every later row `t`
//! of `N`, the maker quotes around the row's open with `t / N` of the horizon
//! elapsed, then is filled one unit against the row's range: the bid fills
//! when `bid >= low`, the ask when `ask <= high`. Both may fill in one bar.

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::inventory::Book;
use crate::quote_engine::{compute_quote, Quote, QuoteInputs};
use crate::volatility::{prepare, SimRow};
use asmm_core::{Series, Side};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Which quotes traded in one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillDecision {
    pub buy: bool,
    pub sell: bool,
}

/// Match a quote against a bar's range.
///
/// With `allow_double_fill` off and both sides touched, the bar's path is
/// unknown, so only the side that reduces `|inventory|` fills.
pub fn match_fills(
    quote: &Quote,
    low: f64,
    high: f64,
    inventory: i64,
    allow_double_fill: bool,
) -> FillDecision {
    let buy = quote.bid >= low;
    let sell = quote.ask <= high;

    if buy && sell && !allow_double_fill {
        return FillDecision {
            buy: inventory < 0,
            sell: inventory > 0,
        };
    }
    FillDecision { buy, sell }
}

/// Per-step trajectory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub time: NaiveDateTime,
    pub mid: f64,
    pub sigma: f64,
    pub time_fraction: f64,
    pub depth_param: f64,
    #[serde(flatten)]
    pub quote: Quote,
    pub bought: bool,
    pub sold: bool,
    /// Inventory after this step's fills.
    pub inventory: i64,
    pub cash: f64,
    /// `cash + inventory × mid` after this step's fills.
    pub unrealized_pnl: f64,
}

/// One executed unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub step: usize,
    pub time: NaiveDateTime,
    pub side: Side,
    pub price: f64,
}

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub steps: Vec<StepRecord>,
    pub fills: Vec<FillRecord>,
    pub final_cash: f64,
    pub final_inventory: i64,
    /// Mid of the last simulated step.
    pub last_mid: f64,
    /// `final_cash + final_inventory × last_mid`.
    pub profit: f64,
}

impl SimulationReport {
    /// Inventory trajectory, starting from the flat warm-up row.
    pub fn inventory_path(&self) -> Vec<i64> {
        std::iter::once(0)
            .chain(self.steps.iter().map(|s| s.inventory))
            .collect()
    }

    /// Mark-to-market PnL trajectory, starting from the warm-up row.
    pub fn pnl_path(&self) -> Vec<f64> {
        std::iter::once(0.0)
            .chain(self.steps.iter().map(|s| s.unrealized_pnl))
            .collect()
    }
}

/// Avellaneda-Stoikov replay.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Normalize a candle series and attach volatility.
    pub fn prepare(&self, series: &Series) -> SimResult<Vec<SimRow>> {
        prepare(series, &self.config)
    }

    /// Prepare `series` and run it.
    pub fn run_series(&self, series: &Series) -> SimResult<SimulationReport> {
        let rows = self.prepare(series)?;
        self.run(&rows)
    }

    /// Run over prepared rows.
    ///
    /// # Errors
    /// `Domain` with the offending step index when a quote is undefined.
    pub fn run(&self, rows: &[SimRow]) -> SimResult<SimulationReport> {
        let cfg = &self.config;
        let n = rows.len();
        let mut book = Book::new();
        let mut steps = Vec::with_capacity(n.saturating_sub(1));
        let mut fills = Vec::new();

        info!(rows = n, gamma = cfg.risk_aversion, "Starting simulation");

        for (step, row) in rows.iter().enumerate().skip(1) {
            let time_fraction = step as f64 / n as f64;
            let depth_param = if cfg.volume_depth {
                cfg.volume_sensitivity * row.volume
            } else {
                cfg.depth_param
            };

            let quote = compute_quote(&QuoteInputs {
                mid: row.open,
                inventory: book.inventory,
                sigma: row.sigma,
                time_fraction,
                horizon: cfg.horizon,
                risk_aversion: cfg.risk_aversion,
                depth_param,
            })
            .map_err(|source| {
                error!(step, time = %row.time, %source, "Simulation aborted");
                SimError::Domain { step, source }
            })?;

            let decision = match_fills(
                &quote,
                row.low,
                row.high,
                book.inventory,
                cfg.allow_double_fill,
            );
            if decision.buy {
                book.record_fill(Side::Buy, quote.bid);
                fills.push(FillRecord {
                    step,
                    time: row.time,
                    side: Side::Buy,
                    price: quote.bid,
                });
            }
            if decision.sell {
                book.record_fill(Side::Sell, quote.ask);
                fills.push(FillRecord {
                    step,
                    time: row.time,
                    side: Side::Sell,
                    price: quote.ask,
                });
            }
            if decision.buy || decision.sell {
                debug!(step, bought = decision.buy, sold = decision.sell, inventory = book.inventory, "Filled");
            }

            steps.push(StepRecord {
                step,
                time: row.time,
                mid: row.open,
                sigma: row.sigma,
                time_fraction,
                depth_param,
                quote,
                bought: decision.buy,
                sold: decision.sell,
                inventory: book.inventory,
                cash: book.cash,
                unrealized_pnl: book.mark_to_market(row.open),
            });
        }

        let last_mid = steps
            .last()
            .map(|s| s.mid)
            .or_else(|| rows.last().map(|r| r.open))
            .unwrap_or(0.0);
        let profit = book.mark_to_market(last_mid);

        info!(
            steps = steps.len(),
            fills = book.fill_count,
            final_cash = book.cash,
            final_inventory = book.inventory,
            profit,
            "Simulation finished"
        );

        Ok(SimulationReport {
            steps,
            fills,
            final_cash: book.cash,
            final_inventory: book.inventory,
            last_mid,
            profit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuoteError;
    use chrono::{Duration, NaiveDate};

    fn t(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn row(minute: i64, open: f64, low: f64, high: f64, sigma: f64, volume: f64) -> SimRow {
        SimRow {
            time: t(minute),
            open,
            high,
            low,
            close: open,
            volume,
            sigma,
        }
    }

    fn quote(bid: f64, ask: f64) -> Quote {
        Quote {
            reservation_price: (bid + ask) / 2.0,
            spread: ask - bid,
            half_spread: (ask - bid) / 2.0,
            bid,
            ask,
        }
    }

    fn close_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_bid_fills_at_or_above_low() {
        let q = quote(99.5, 100.5);
        assert!(match_fills(&q, 99.0, 100.0, 0, true).buy);
        assert!(match_fills(&q, 99.5, 100.0, 0, true).buy);
        assert!(!match_fills(&q, 99.6, 100.0, 0, true).buy);
    }

    #[test]
    fn test_ask_fills_at_or_below_high() {
        let q = quote(99.5, 100.5);
        assert!(match_fills(&q, 100.0, 100.5, 0, true).sell);
        assert!(!match_fills(&q, 100.0, 100.4, 0, true).sell);
    }

    #[test]
    fn test_double_fill_toggle() {
        let q = quote(99.5, 100.5);
        let both = FillDecision {
            buy: true,
            sell: true,
        };
        assert_eq!(match_fills(&q, 99.0, 101.0, 0, true), both);

        // Only the side reducing exposure.
        assert_eq!(
            match_fills(&q, 99.0, 101.0, 2, false),
            FillDecision {
                buy: false,
                sell: true
            }
        );
        assert_eq!(
            match_fills(&q, 99.0, 101.0, -1, false),
            FillDecision {
                buy: true,
                sell: false
            }
        );
        assert_eq!(match_fills(&q, 99.0, 101.0, 0, false), FillDecision::default());
        // Single-sided touches are unaffected.
        assert!(match_fills(&q, 99.0, 100.0, 0, false).buy);
    }

    #[test]
    fn test_buy_fill_updates_book() {
        // σ = 0, k = 0.1 × 10 = 1: bid = 100 − ln 2 ≈ 99.307
        let rows = vec![
            row(0, 100.0, 100.0, 100.0, 0.0, 10.0),
            row(1, 100.0, 99.0, 100.2, 0.0, 10.0),
        ];
        let report = Simulator::new(SimConfig::default()).unwrap().run(&rows).unwrap();

        let step = &report.steps[0];
        assert!(step.bought);
        assert!(!step.sold);
        assert_eq!(report.final_inventory, 1);
        assert!(close_eq(report.final_cash, -step.quote.bid));
        assert!(close_eq(step.quote.bid, 100.0 - 2f64.ln()));
        assert_eq!(report.fills.len(), 1);
        assert_eq!(report.fills[0].side, Side::Buy);
    }

    #[test]
    fn test_round_trip_profit() {
        let rows = vec![
            row(0, 100.0, 100.0, 100.0, 0.0, 10.0),
            row(1, 100.0, 99.0, 100.2, 0.0, 10.0),
            row(2, 101.0, 101.5, 102.0, 0.0, 10.0),
        ];
        let report = Simulator::new(SimConfig::default()).unwrap().run(&rows).unwrap();

        let ln2 = 2f64.ln();
        assert_eq!(report.inventory_path(), vec![0, 1, 0]);
        // Bought at 100 − ln 2, sold at 101 + ln 2.
        assert!(close_eq(report.profit, 1.0 + 2.0 * ln2));
        assert!(close_eq(report.steps[0].unrealized_pnl, ln2));
        assert!(close_eq(report.pnl_path()[2], report.profit));
        assert!(close_eq(report.steps[0].time_fraction, 1.0 / 3.0));
        assert!(close_eq(report.steps[1].time_fraction, 2.0 / 3.0));
    }

    #[test]
    fn test_flat_series_spread_stays_at_floor() {
        let rows: Vec<SimRow> = (0..5).map(|m| row(m, 100.0, 100.0, 100.0, 0.0, 10.0)).collect();
        let report = Simulator::new(SimConfig::default()).unwrap().run(&rows).unwrap();

        assert_eq!(report.steps.len(), 4);
        let floor = 2.0 * 2f64.ln();
        for step in &report.steps {
            assert!(close_eq(step.quote.spread, floor));
            assert_eq!(step.quote.reservation_price, 100.0);
            assert!(!step.bought && !step.sold);
        }
        assert_eq!(report.profit, 0.0);
        assert_eq!(report.last_mid, 100.0);
    }

    #[test]
    fn test_both_sides_fill_in_one_bar() {
        let rows = vec![
            row(0, 100.0, 100.0, 100.0, 0.0, 10.0),
            row(1, 100.0, 95.0, 105.0, 0.0, 10.0),
        ];
        let report = Simulator::new(SimConfig::default()).unwrap().run(&rows).unwrap();

        assert_eq!(report.fills.len(), 2);
        assert_eq!(report.final_inventory, 0);
        assert!(close_eq(report.final_cash, 2.0 * 2f64.ln()));
    }

    #[test]
    fn test_inventory_skews_next_quote() {
        let sigma = 0.3;
        let rows = vec![
            row(0, 100.0, 100.0, 100.0, sigma, 10.0),
            row(1, 100.0, 90.0, 100.0, sigma, 10.0),
            row(2, 100.0, 100.0, 100.0, sigma, 10.0),
        ];
        let report = Simulator::new(SimConfig::default()).unwrap().run(&rows).unwrap();

        // Long one unit after step 1: r = 100 − 1 × 1 × 0.09 × (1 − 2/3)
        assert_eq!(report.steps[0].inventory, 1);
        assert!(close_eq(
            report.steps[1].quote.reservation_price,
            100.0 - 0.09 / 3.0
        ));
    }

    #[test]
    fn test_zero_volume_reports_step() {
        let rows = vec![
            row(0, 100.0, 100.0, 100.0, 0.0, 10.0),
            row(1, 100.0, 100.0, 100.0, 0.0, 10.0),
            row(2, 100.0, 100.0, 100.0, 0.0, 10.0),
            row(3, 100.0, 100.0, 100.0, 0.0, 0.0),
        ];
        let err = Simulator::new(SimConfig::default())
            .unwrap()
            .run(&rows)
            .unwrap_err();

        match err {
            SimError::Domain { step, source } => {
                assert_eq!(step, 3);
                assert_eq!(source, QuoteError::NonPositiveDepth(0.0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_risk_aversion_reports_first_step() {
        let config = SimConfig {
            risk_aversion: 0.0,
            ..Default::default()
        };
        let rows: Vec<SimRow> = (0..3).map(|m| row(m, 100.0, 100.0, 100.0, 0.0, 10.0)).collect();
        let err = Simulator::new(config).unwrap().run(&rows).unwrap_err();
        assert!(matches!(err, SimError::Domain { step: 1, .. }));
    }

    #[test]
    fn test_static_depth_mode() {
        let config = SimConfig {
            volume_depth: false,
            depth_param: 2.0,
            ..Default::default()
        };
        let rows = vec![
            row(0, 100.0, 100.0, 100.0, 0.0, 0.0),
            row(1, 100.0, 100.0, 100.0, 0.0, 0.0),
        ];
        let report = Simulator::new(config).unwrap().run(&rows).unwrap();
        assert_eq!(report.steps[0].depth_param, 2.0);
        assert!(close_eq(report.steps[0].quote.spread, 2.0 * 1.5f64.ln()));
    }

    #[test]
    fn test_empty_and_single_row() {
        let sim = Simulator::new(SimConfig::default()).unwrap();

        let empty = sim.run(&[]).unwrap();
        assert!(empty.steps.is_empty());
        assert_eq!(empty.profit, 0.0);

        let single = sim.run(&[row(0, 100.0, 100.0, 100.0, 0.0, 10.0)]).unwrap();
        assert!(single.steps.is_empty());
        assert_eq!(single.last_mid, 100.0);
        assert_eq!(single.inventory_path(), vec![0]);
    }
}
