//! Tracked symbol list.
//!
//! Parses symbol lists from configuration and drops symbols whose stored
//! history can never fill the engine's window.

use crate::domain::error::PullbackError;
use crate::ports::data_port::DataPort;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Universe {
    pub codes: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.codes.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

pub struct UniverseValidationResult {
    pub universe: Universe,
    pub skipped: Vec<SkippedCode>,
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

pub fn validate_universe(
    data_port: &dyn DataPort,
    codes: Vec<String>,
    minimum_bars: usize,
) -> Result<UniverseValidationResult, PullbackError> {
    let mut valid_codes = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let bars = match data_port.get_data_range(&code) {
            Ok(Some((_, _, bars))) => bars,
            Ok(None) => {
                tracing::warn!(code = code.as_str(), "skipping symbol, no data found");
                skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::NoData,
                });
                continue;
            }
            Err(e) => {
                tracing::warn!(code = code.as_str(), error = %e, "skipping symbol");
                skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if bars < minimum_bars {
            tracing::warn!(
                code = code.as_str(),
                bars,
                minimum_bars,
                "skipping symbol, history shorter than the signal window"
            );
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::InsufficientBars { bars },
            });
            continue;
        }

        tracing::info!(code = code.as_str(), bars, "symbol ok");
        valid_codes.push(code);
    }

    if valid_codes.is_empty() {
        return Err(PullbackError::InsufficientHistory {
            code: "all".to_string(),
            bars: 0,
            minimum: minimum_bars,
        });
    }

    Ok(UniverseValidationResult {
        universe: Universe { codes: valid_codes },
        skipped,
    })
}
