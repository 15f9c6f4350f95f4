//! Wall clock port, live or simulated.

use chrono::NaiveDateTime;

pub trait ClockPort {
    fn now(&self) -> NaiveDateTime;
}
