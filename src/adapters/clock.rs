//! Clock adapters.

use chrono::{Local, NaiveDateTime};
use std::cell::Cell;

use crate::ports::clock_port::ClockPort;

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Simulated clock, moved forward by the replay driver.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }
}

impl ClockPort for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}
