//! Daily OHLCV bar and candle geometry.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub code: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// Close below open ("yin" candle).
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// high - max(open, close)
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.close.max(self.open)
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Upper shadow as a fraction of the full range. `None` for a flat bar.
    pub fn upper_shadow_ratio(&self) -> Option<f64> {
        let range = self.range();
        if range > 0.0 {
            Some(self.upper_shadow() / range)
        } else {
            None
        }
    }
}
