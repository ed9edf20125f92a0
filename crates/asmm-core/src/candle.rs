//! OHLCV candles and ordered series.
//!
//! A `Series` is always ascending by `time` with no duplicate timestamps.
//! Every constructor and combinator restores that invariant, so callers never
//! see a partially ordered series.

use crate::clock::{epoch_ms, from_epoch_ms};
use crate::error::{CoreError, Result};
use crate::interval::Interval;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV bar, keyed by its open time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, naive UTC.
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(time: NaiveDateTime, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Build a candle from an exchange open time in epoch milliseconds.
    pub fn from_open_time_ms(
        open_time_ms: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self> {
        Ok(Self::new(
            from_epoch_ms(open_time_ms)?,
            open,
            high,
            low,
            close,
            volume,
        ))
    }

    /// Open time in epoch milliseconds.
    pub fn open_time_ms(&self) -> i64 {
        epoch_ms(self.time)
    }

    /// `low <= min(open, close) <= max(open, close) <= high`.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }

    /// Reject bars that break the OHLC ordering or carry NaN/negative volume.
    pub fn validate(&self) -> Result<()> {
        if !self.is_consistent() {
            return Err(CoreError::InvalidCandle(format!(
                "{}: OHLC out of order (o={} h={} l={} c={})",
                self.time, self.open, self.high, self.low, self.close
            )));
        }
        if !(self.volume >= 0.0) {
            return Err(CoreError::InvalidCandle(format!(
                "{}: volume {} is not a non-negative number",
                self.time, self.volume
            )));
        }
        Ok(())
    }
}

/// Cache key for a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: String,
    pub interval: Interval,
}

impl SeriesKey {
    pub fn new(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

/// Ascending, deduplicated run of candles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort ascending and collapse equal timestamps.
    ///
    /// When two candles share a timestamp the one appearing later in the
    /// input wins.
    pub fn from_candles(mut candles: Vec<Candle>) -> Self {
        // Stable, so input order decides which duplicate survives.
        candles.sort_by_key(|c| c.time);

        let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match out.last_mut() {
                Some(prev) if prev.time == candle.time => *prev = candle,
                _ => out.push(candle),
            }
        }

        Self { candles: out }
    }

    /// Concatenate `newer` after `self`, dedup and re-sort.
    ///
    /// Candles in `newer` replace cached candles with the same timestamp.
    /// Merging the same suffix twice gives the same result as merging once.
    pub fn merge(self, newer: Series) -> Series {
        let mut all = self.candles;
        all.extend(newer.candles);
        Self::from_candles(all)
    }

    /// Copy of the rows with `time >= start` and/or `time <= end`.
    ///
    /// Each bound is optional and applied independently. `self` is untouched.
    pub fn slice(&self, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Series {
        let candles = self
            .candles
            .iter()
            .filter(|c| start.map_or(true, |s| c.time >= s))
            .filter(|c| end.map_or(true, |e| c.time <= e))
            .cloned()
            .collect();
        Self { candles }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Open time of the newest candle.
    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.candles.last().map(|c| c.time)
    }

    /// Strictly increasing timestamps, hence no duplicates.
    pub fn is_strictly_ascending(&self) -> bool {
        self.candles.windows(2).all(|w| w[0].time < w[1].time)
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
