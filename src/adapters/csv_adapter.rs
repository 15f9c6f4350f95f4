//! CSV file data adapter.
//!
//! One file per symbol, `{base_path}/{code}.csv`, with header
//! `date,open,high,low,close,volume`. File stems match codes
//! case-insensitively, so `sz000001.csv` serves `SZ000001`.

use crate::domain::error::PullbackError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> Option<PathBuf> {
        let exact = self.base_path.join(format!("{}.csv", code));
        if exact.is_file() {
            return Some(exact);
        }
        fs::read_dir(&self.base_path)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|path| {
                path.extension().is_some_and(|ext| ext == "csv")
                    && path
                        .file_stem()
                        .and_then(|stem| stem.to_str())
                        .is_some_and(|stem| stem.eq_ignore_ascii_case(code))
            })
    }

    /// Every bar in the file, sorted by date. A missing file is `NoData`.
    pub fn load_all(&self, code: &str) -> Result<Vec<OhlcvBar>, PullbackError> {
        let path = self.csv_path(code).ok_or_else(|| PullbackError::NoData {
            code: code.to_string(),
        })?;
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| PullbackError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| PullbackError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                PullbackError::Data {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            bars.push(OhlcvBar {
                code: code.to_string(),
                date,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, PullbackError> {
    record
        .get(index)
        .ok_or_else(|| PullbackError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| PullbackError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        code: &str,
        as_of: NaiveDate,
        count: usize,
    ) -> Result<Vec<OhlcvBar>, PullbackError> {
        let mut bars = self.load_all(code)?;
        bars.retain(|b| b.date <= as_of);
        let start = bars.len().saturating_sub(count);
        Ok(bars.split_off(start))
    }

    fn list_symbols(&self) -> Result<Vec<String>, PullbackError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| PullbackError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| PullbackError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, PullbackError> {
        let bars = match self.load_all(code) {
            Ok(bars) => bars,
            Err(PullbackError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
