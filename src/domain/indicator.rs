//! Moving averages and ratios over a bar window.
//!
//! Every helper returns `None` instead of dividing by zero or averaging an
//! empty window; callers treat `None` as "condition not met".

use crate::domain::ohlcv::OhlcvBar;

/// Simple moving average of the closes of the last `period` bars.
pub fn sma_close(bars: &[OhlcvBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    Some(window.iter().map(|b| b.close).sum::<f64>() / period as f64)
}

/// `numerator / denominator`, or `None` when the denominator is zero or
/// either side is not finite.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator)
}

/// The `recent_days` bars ending the session before the last bar.
///
/// Clamped to the start of `bars` when the window doesn't reach back far
/// enough. Empty when `bars` has fewer than two entries.
pub fn recent_slice(bars: &[OhlcvBar], recent_days: usize) -> &[OhlcvBar] {
    if bars.len() < 2 {
        return &[];
    }
    let end = bars.len() - 1;
    let start = end.saturating_sub(recent_days);
    &bars[start..end]
}

/// Last close over first close, minus one.
pub fn recent_increase(slice: &[OhlcvBar]) -> Option<f64> {
    let first = slice.first()?;
    let last = slice.last()?;
    ratio(last.close, first.close).map(|r| r - 1.0)
}
