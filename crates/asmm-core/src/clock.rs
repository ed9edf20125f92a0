//! Wall clock abstraction and epoch conversions.
//!
//! All timestamps are naive UTC. The exchange speaks epoch milliseconds.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of "now" for freshness decisions.
pub trait Clock: Send + Sync {
    /// Current time as naive UTC.
    fn now(&self) -> NaiveDateTime;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

/// Naive UTC timestamp to epoch milliseconds.
pub fn epoch_ms(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp_millis()
}

/// Epoch milliseconds to naive UTC timestamp.
pub fn from_epoch_ms(ms: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or(CoreError::InvalidTimestamp(ms))
}
