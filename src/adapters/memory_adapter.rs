//! Preloaded in-memory bar store.
//!
//! Replay loads each symbol's history once and serves every as-of window
//! from memory, so the backing source is read once per symbol rather than
//! once per invocation.

use crate::domain::error::PullbackError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryDataAdapter {
    bars: HashMap<String, Vec<OhlcvBar>>,
}

impl MemoryDataAdapter {
    /// Reads the full history of each code from `source`. Codes without
    /// data are stored empty.
    pub fn preload(source: &dyn DataPort, codes: &[String]) -> Result<Self, PullbackError> {
        let mut store = Self::default();
        for code in codes {
            let bars = match source.get_data_range(code)? {
                Some((_, last, count)) => source.fetch_bars(code, last, count)?,
                None => Vec::new(),
            };
            store.insert(code, bars);
        }
        Ok(store)
    }

    pub fn insert(&mut self, code: &str, mut bars: Vec<OhlcvBar>) {
        bars.sort_by_key(|b| b.date);
        self.bars.insert(code.to_string(), bars);
    }
}

impl DataPort for MemoryDataAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        as_of: NaiveDate,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, PullbackError> {
        let bars = self.bars.get(code).ok_or_else(|| PullbackError::NoData {
            code: code.to_string(),
        })?;
        let end = bars.partition_point(|b| b.date <= as_of);
        let start = end.saturating_sub(count);
        Ok(bars[start..end].to_vec())
    }

    fn list_symbols(&self) -> Result<Vec<String>, PullbackError> {
        let mut codes: Vec<String> = self.bars.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PullbackError> {
        Ok(self.bars.get(code).and_then(|bars| {
            match (bars.first(), bars.last()) {
                (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
                _ => None,
            }
        }))
    }
}
