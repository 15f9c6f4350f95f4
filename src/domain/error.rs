//! Domain error types.

/// Top-level error type for pullback.
#[derive(Debug, thiserror::Error)]
pub enum PullbackError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient history for {code}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("order rejected for {code}: {reason}")]
    Order { code: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PullbackError> for std::process::ExitCode {
    fn from(err: &PullbackError) -> Self {
        let code: u8 = match err {
            PullbackError::Io(_) => 1,
            PullbackError::ConfigParse { .. }
            | PullbackError::ConfigMissing { .. }
            | PullbackError::ConfigInvalid { .. } => 2,
            PullbackError::Data { .. } => 3,
            PullbackError::Order { .. } => 4,
            PullbackError::NoData { .. } | PullbackError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_history_message() {
        let err = PullbackError::InsufficientHistory {
            code: "000001.XSHE".into(),
            bars: 10,
            minimum: 62,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for 000001.XSHE: have 10 bars, need 62"
        );
    }

    #[test]
    fn config_invalid_message() {
        let err = PullbackError::ConfigInvalid {
            section: "signal".into(),
            key: "ma_days".into(),
            reason: "ma_days must be at least 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [signal] ma_days: ma_days must be at least 1"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PullbackError = io.into();
        assert!(matches!(err, PullbackError::Io(_)));
    }
}
