#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pullback::domain::error::PullbackError;
pub use pullback::domain::ohlcv::OhlcvBar;
use pullback::ports::data_port::DataPort;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    /// Number of `fetch_bars` calls served.
    pub fetch_calls: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetch_calls: Cell::new(0),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    fn check(&self, code: &str) -> Result<(), PullbackError> {
        match self.errors.get(code) {
            Some(reason) => Err(PullbackError::Data {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        code: &str,
        as_of: NaiveDate,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, PullbackError> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        self.check(code)?;
        let upto: Vec<OhlcvBar> = self
            .data
            .get(code)
            .map(|bars| bars.iter().filter(|b| b.date <= as_of).cloned().collect())
            .unwrap_or_default();
        let start = upto.len().saturating_sub(count);
        Ok(upto[start..].to_vec())
    }

    fn list_symbols(&self) -> Result<Vec<String>, PullbackError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PullbackError> {
        self.check(code)?;
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Session `n` counted from 2024-01-01, calendar days.
pub fn day(n: i64) -> NaiveDate {
    date(2024, 1, 1) + Duration::days(n)
}

pub fn at(d: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    d.and_hms_opt(h, m, 0).unwrap()
}

pub fn bar(code: &str, d: NaiveDate, open: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        code: code.to_string(),
        date: d,
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume,
    }
}

/// `n` flat bars at 100 on volume 100, days 0..n.
pub fn flat_bars(code: &str, n: usize) -> Vec<OhlcvBar> {
    (0..n as i64)
        .map(|i| bar(code, day(i), 100.0, 100.0, 100.0))
        .collect()
}

/// 61 flat sessions then a breakout on day 61: close 110 on volume 300.
pub fn breakout_bars(code: &str) -> Vec<OhlcvBar> {
    let mut bars = flat_bars(code, 61);
    bars.push(bar(code, day(61), 101.0, 110.0, 300.0));
    bars
}

/// Breakout on day 61 then a bearish, quiet pullback on day 62 closing at 108.
pub fn breakout_then_pullback(code: &str) -> Vec<OhlcvBar> {
    let mut bars = breakout_bars(code);
    bars.push(bar(code, day(62), 112.0, 108.0, 40.0));
    bars
}

pub fn write_csv(dir: &Path, code: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        writeln!(
            content,
            "{},{},{},{},{},{}",
            b.date, b.open, b.high, b.low, b.close, b.volume
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{code}.csv")), content).unwrap();
}
