//! Breakout-and-pullback rule parameters.
//!
//! Fixed for the lifetime of a run; built once from the `[signal]` section.

use chrono::NaiveTime;

pub const DEFAULT_MA_DAYS: usize = 60;
pub const DEFAULT_VOLUME_INCREASE_RATIO: f64 = 2.0;
pub const DEFAULT_PRICE_INCREASE_RATIO: f64 = 0.05;
pub const DEFAULT_VOLUME_DECREASE_RATIO: f64 = 0.5;
pub const DEFAULT_BUY_TIME: &str = "14:55:00";
pub const DEFAULT_UPPER_SHADOW_RATIO: f64 = 0.3;
pub const DEFAULT_SHADOW_VOLUME_RATIO: f64 = 1.5;
pub const DEFAULT_RECENT_INCREASE_RATIO: f64 = 0.5;
pub const DEFAULT_RECENT_DAYS: usize = 20;
pub const DEFAULT_BUY_CASH_FRACTION: f64 = 0.9;

/// Replay invocation time when `[replay] invoke_times` is absent.
pub const DEFAULT_INVOKE_TIME: &str = "15:00:00";

pub const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    /// Moving-average length in sessions.
    pub ma_days: usize,
    /// Breakout volume must exceed yesterday's by this multiple.
    pub volume_increase_ratio: f64,
    /// Breakout close must exceed yesterday's by this fraction.
    pub price_increase_ratio: f64,
    /// Pullback volume must fall below this multiple of yesterday's.
    pub volume_decrease_ratio: f64,
    /// Earliest wall-clock time for the pullback buy.
    pub buy_time: NaiveTime,
    pub upper_shadow_ratio: f64,
    pub shadow_volume_ratio: f64,
    /// Skip the session when the trailing run-up exceeds this fraction.
    pub recent_increase_ratio: f64,
    pub recent_days: usize,
    /// Share of available cash committed to the pullback buy.
    pub buy_cash_fraction: f64,
}

impl SignalConfig {
    /// Bars needed for today's and yesterday's moving average.
    pub fn window_len(&self) -> usize {
        self.ma_days + 2
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            ma_days: DEFAULT_MA_DAYS,
            volume_increase_ratio: DEFAULT_VOLUME_INCREASE_RATIO,
            price_increase_ratio: DEFAULT_PRICE_INCREASE_RATIO,
            volume_decrease_ratio: DEFAULT_VOLUME_DECREASE_RATIO,
            buy_time: NaiveTime::from_hms_opt(14, 55, 0).unwrap_or(NaiveTime::MIN),
            upper_shadow_ratio: DEFAULT_UPPER_SHADOW_RATIO,
            shadow_volume_ratio: DEFAULT_SHADOW_VOLUME_RATIO,
            recent_increase_ratio: DEFAULT_RECENT_INCREASE_RATIO,
            recent_days: DEFAULT_RECENT_DAYS,
            buy_cash_fraction: DEFAULT_BUY_CASH_FRACTION,
        }
    }
}
