//! Configuration validation.
//!
//! Validates the `[signal]` and `[replay]` sections before anything runs.

use crate::domain::config::{self as defaults, TIME_FORMAT};
use crate::domain::error::PullbackError;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveTime};

pub const SIGNAL: &str = "signal";
pub const REPLAY: &str = "replay";

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    validate_min_int(config, "ma_days", defaults::DEFAULT_MA_DAYS as i64, 1)?;
    validate_min_int(config, "recent_days", defaults::DEFAULT_RECENT_DAYS as i64, 1)?;
    validate_positive(config, "volume_increase_ratio", defaults::DEFAULT_VOLUME_INCREASE_RATIO)?;
    validate_positive(config, "volume_decrease_ratio", defaults::DEFAULT_VOLUME_DECREASE_RATIO)?;
    validate_positive(config, "shadow_volume_ratio", defaults::DEFAULT_SHADOW_VOLUME_RATIO)?;
    validate_price_increase(config)?;
    validate_upper_shadow(config)?;
    validate_recent_increase(config)?;
    validate_buy_cash_fraction(config)?;
    parse_time(SIGNAL, "buy_time", config.get_string(SIGNAL, "buy_time").as_deref())?;
    Ok(())
}

pub fn validate_replay_config(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    validate_data_dir(config)?;
    validate_symbols(config)?;
    validate_initial_cash(config)?;
    validate_commission(config)?;
    validate_dates(config)?;
    validate_invoke_times(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PullbackError {
    PullbackError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_min_int(
    config: &dyn ConfigPort,
    key: &str,
    default: i64,
    min: i64,
) -> Result<(), PullbackError> {
    let malformed = config
        .get_string(SIGNAL, key)
        .is_some_and(|raw| raw.trim().parse::<i64>().is_err());
    if malformed {
        return Err(invalid(SIGNAL, key, format!("{} must be an integer", key)));
    }
    if config.get_int(SIGNAL, key, default) < min {
        return Err(invalid(SIGNAL, key, format!("{} must be at least {}", key, min)));
    }
    Ok(())
}

fn validate_number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), PullbackError> {
    let malformed = config
        .get_string(section, key)
        .is_some_and(|raw| !raw.trim().parse::<f64>().is_ok_and(f64::is_finite));
    if malformed {
        return Err(invalid(section, key, format!("{} must be a number", key)));
    }
    Ok(())
}

fn validate_positive(
    config: &dyn ConfigPort,
    key: &str,
    default: f64,
) -> Result<(), PullbackError> {
    validate_number(config, SIGNAL, key)?;
    if config.get_double(SIGNAL, key, default) <= 0.0 {
        return Err(invalid(SIGNAL, key, format!("{} must be positive", key)));
    }
    Ok(())
}

fn validate_price_increase(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let key = "price_increase_ratio";
    validate_number(config, SIGNAL, key)?;
    if config.get_double(SIGNAL, key, defaults::DEFAULT_PRICE_INCREASE_RATIO) < 0.0 {
        return Err(invalid(SIGNAL, key, "price_increase_ratio must be non-negative"));
    }
    Ok(())
}

fn validate_upper_shadow(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let key = "upper_shadow_ratio";
    validate_number(config, SIGNAL, key)?;
    let value = config.get_double(SIGNAL, key, defaults::DEFAULT_UPPER_SHADOW_RATIO);
    if value <= 0.0 || value >= 1.0 {
        return Err(invalid(SIGNAL, key, "upper_shadow_ratio must be between 0 and 1"));
    }
    Ok(())
}

fn validate_recent_increase(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    validate_number(config, SIGNAL, "recent_increase_ratio")
}

fn validate_buy_cash_fraction(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let key = "buy_cash_fraction";
    validate_number(config, SIGNAL, key)?;
    let value = config.get_double(SIGNAL, key, defaults::DEFAULT_BUY_CASH_FRACTION);
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(SIGNAL, key, "buy_cash_fraction must be in (0, 1]"));
    }
    Ok(())
}

/// `HH:MM:SS`, or the default buy time when absent.
pub fn parse_time(
    section: &str,
    key: &str,
    value: Option<&str>,
) -> Result<NaiveTime, PullbackError> {
    let raw = value.unwrap_or(defaults::DEFAULT_BUY_TIME).trim();
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|_| invalid(section, key, format!("invalid time {:?}, expected HH:MM:SS", raw)))
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    match config.get_string(REPLAY, "data_dir") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(PullbackError::ConfigMissing {
            section: REPLAY.to_string(),
            key: "data_dir".to_string(),
        }),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    match config.get_string(REPLAY, "symbols") {
        Some(s) if !s.trim().is_empty() => parse_codes(&s)
            .map(|_| ())
            .map_err(|e| invalid(REPLAY, "symbols", e.to_string())),
        _ => Err(PullbackError::ConfigMissing {
            section: REPLAY.to_string(),
            key: "symbols".to_string(),
        }),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    validate_number(config, REPLAY, "initial_cash")?;
    if config.get_double(REPLAY, "initial_cash", 100_000.0) <= 0.0 {
        return Err(invalid(REPLAY, "initial_cash", "initial_cash must be positive"));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    for key in ["commission_per_trade", "commission_pct"] {
        validate_number(config, REPLAY, key)?;
        if config.get_double(REPLAY, key, 0.0) < 0.0 {
            return Err(invalid(REPLAY, key, format!("{} must be non-negative", key)));
        }
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    let start = parse_optional_date(
        config.get_string(REPLAY, "start_date").as_deref(),
        "start_date",
    )?;
    let end = parse_optional_date(config.get_string(REPLAY, "end_date").as_deref(), "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid(REPLAY, "start_date", "start_date must not be after end_date"));
        }
    }
    Ok(())
}

pub fn parse_optional_date(
    value: Option<&str>,
    field: &str,
) -> Result<Option<NaiveDate>, PullbackError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    REPLAY,
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

/// Comma-separated `HH:MM:SS` list, sorted ascending.
pub fn parse_invoke_times(value: Option<&str>) -> Result<Vec<NaiveTime>, PullbackError> {
    let raw = value.unwrap_or(defaults::DEFAULT_INVOKE_TIME);
    let mut times = raw
        .split(',')
        .map(|t| parse_time(REPLAY, "invoke_times", Some(t)))
        .collect::<Result<Vec<_>, _>>()?;
    times.sort();
    times.dedup();
    Ok(times)
}

fn validate_invoke_times(config: &dyn ConfigPort) -> Result<(), PullbackError> {
    parse_invoke_times(config.get_string(REPLAY, "invoke_times").as_deref()).map(|_| ())
}
