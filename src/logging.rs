//! Tracing subscriber setup.

use crate::ports::config_port::ConfigPort;

pub const LOG_ENV: &str = "PULLBACK_LOG";
pub const DEFAULT_LEVEL: &str = "info";
pub const DEFAULT_FORMAT: &str = "text";

/// Installs the global subscriber. `PULLBACK_LOG` overrides `log_level`.
///
/// A subscriber that is already installed is kept; only the first call in a
/// process takes effect.
pub fn init_tracing(log_level: &str, log_format: &str, ansi: bool) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let format = log_format.trim().to_lowercase();
    let installed = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .try_init(),
        "text" | "" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .try_init(),
        other => return Err(format!("unknown log format {other:?} (expected text or json)")),
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

/// Reads `[log] level`, `format` and `ansi`.
pub fn init_from_config(config: &dyn ConfigPort) -> Result<(), String> {
    let level = config
        .get_string("log", "level")
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());
    let format = config
        .get_string("log", "format")
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string());
    let ansi = config.get_bool("log", "ansi", true);
    init_tracing(&level, &format, ansi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_format() {
        let err = init_tracing("info", "xml", true).unwrap_err();
        assert!(err.contains("xml"));
    }

    #[test]
    fn repeated_init_is_harmless() {
        assert!(init_tracing("warn", "text", false).is_ok());
        assert!(init_tracing("debug", "json", true).is_ok());
    }
}
