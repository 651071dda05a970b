//! Source of "today" for exchanges and waitlist purchases.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Local;
use common::TradeDate;

/// Provides the current trade date.
pub trait Clock: Send + Sync {
    fn today(&self) -> TradeDate;
}

/// The local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> TradeDate {
        TradeDate::from_naive(Local::now().date_naive())
    }
}

/// A settable clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct FixedClock {
    today: Arc<RwLock<TradeDate>>,
}

impl FixedClock {
    /// Creates a clock frozen at `today`.
    pub fn new(today: TradeDate) -> Self {
        Self {
            today: Arc::new(RwLock::new(today)),
        }
    }

    /// Moves the clock to `today`.
    pub fn set(&self, today: TradeDate) {
        *self.today.write().unwrap_or_else(PoisonError::into_inner) = today;
    }

    /// Moves the clock forward by `days`.
    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.write().unwrap_or_else(PoisonError::into_inner);
        *today = today.plus_days(days);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> TradeDate {
        *self.today.read().unwrap_or_else(PoisonError::into_inner)
    }
}
