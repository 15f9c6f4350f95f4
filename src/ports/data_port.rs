//! Market data access port.

use crate::domain::error::PullbackError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Up to `count` daily bars for `code` dated on or before `as_of`, oldest first.
    ///
    /// Returns fewer than `count` bars when history is short; callers decide
    /// whether that is enough.
    fn fetch_bars(
        &self,
        code: &str,
        as_of: NaiveDate,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, PullbackError>;

    fn list_symbols(&self) -> Result<Vec<String>, PullbackError>;

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PullbackError>;
}
