//! Per-symbol signal state carried between sessions.

use chrono::{Days, NaiveDate};
use std::collections::HashMap;

/// Pending-breakout bookkeeping for one symbol.
///
/// `is_breakout` and `breakout_date` always move together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalState {
    pub is_breakout: bool,
    pub breakout_date: Option<NaiveDate>,
    /// Close of the session the pullback buy was issued on. Informational.
    pub buy_price: f64,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, date: NaiveDate) {
        self.is_breakout = true;
        self.breakout_date = Some(date);
    }

    /// Drops the pending plan. `breakout_date` is kept for inspection.
    pub fn disarm(&mut self) {
        self.is_breakout = false;
    }

    pub fn record_buy(&mut self, price: f64) {
        self.buy_price = price;
        self.is_breakout = false;
    }

    /// Calendar day after the breakout, while a plan is pending.
    pub fn pending_buy_date(&self) -> Option<NaiveDate> {
        if !self.is_breakout {
            return None;
        }
        self.breakout_date?.checked_add_days(Days::new(1))
    }
}

/// One [`SignalState`] per tracked symbol.
#[derive(Debug, Clone, Default)]
pub struct SignalBook {
    states: HashMap<String, SignalState>,
}

impl SignalBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_mut(&mut self, code: &str) -> &mut SignalState {
        self.states.entry(code.to_string()).or_default()
    }

    pub fn get(&self, code: &str) -> Option<&SignalState> {
        self.states.get(code)
    }

    pub fn armed_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .states
            .iter()
            .filter(|(_, s)| s.is_breakout)
            .map(|(c, _)| c.clone())
            .collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_state_is_idle() {
        let s = SignalState::new();
        assert!(!s.is_breakout);
        assert!(s.breakout_date.is_none());
        assert_eq!(s.buy_price, 0.0);
        assert!(s.pending_buy_date().is_none());
    }

    #[test]
    fn arm_sets_flag_and_date() {
        let mut s = SignalState::new();
        s.arm(date(2024, 3, 4));
        assert!(s.is_breakout);
        assert_eq!(s.breakout_date, Some(date(2024, 3, 4)));
        assert_eq!(s.pending_buy_date(), Some(date(2024, 3, 5)));
    }

    #[test]
    fn pending_buy_date_crosses_month_end() {
        let mut s = SignalState::new();
        s.arm(date(2024, 2, 29));
        assert_eq!(s.pending_buy_date(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn disarm_keeps_breakout_date() {
        let mut s = SignalState::new();
        s.arm(date(2024, 3, 4));
        s.disarm();
        assert!(!s.is_breakout);
        assert_eq!(s.breakout_date, Some(date(2024, 3, 4)));
        assert!(s.pending_buy_date().is_none());
    }

    #[test]
    fn record_buy_clears_flag() {
        let mut s = SignalState::new();
        s.arm(date(2024, 3, 4));
        s.record_buy(108.0);
        assert!(!s.is_breakout);
        assert_eq!(s.buy_price, 108.0);
    }

    #[test]
    fn book_keeps_states_per_symbol() {
        let mut book = SignalBook::new();
        book.state_mut("AAA").arm(date(2024, 3, 4));
        book.state_mut("BBB");

        assert!(book.get("AAA").unwrap().is_breakout);
        assert!(!book.get("BBB").unwrap().is_breakout);
        assert!(book.get("CCC").is_none());
        assert_eq!(book.armed_codes(), vec!["AAA".to_string()]);
    }
}
