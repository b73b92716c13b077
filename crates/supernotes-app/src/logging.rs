//! Tracing subscriber setup.
//!
//! Environment variables:
//!   LOG_FORMAT  - "json" or "text" (default: "text")
//!   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
//!   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
//!   RUST_LOG    - standard env filter (default: [`DEFAULT_FILTER`])

use std::path::Path;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{ConfigError, ConfigResult};

pub const DEFAULT_FILTER: &str =
    "supernotes=info,supernotes_app=info,supernotes_session=info,supernotes_db=info,supernotes_gateway=info";

const DEFAULT_LOG_FILE_NAME: &str = "supernotes.log";

/// Output settings for [`init_tracing`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub json: bool,
    pub file: Option<String>,
    pub ansi: Option<bool>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("LOG_FORMAT").ok(),
            std::env::var("LOG_FILE").ok(),
            std::env::var("LOG_ANSI").ok(),
        )
    }

    fn from_values(format: Option<String>, file: Option<String>, ansi: Option<String>) -> Self {
        Self {
            json: format.as_deref() == Some("json"),
            file: file.filter(|f| !f.is_empty()),
            ansi: ansi.map(|v| v == "true" || v == "1"),
        }
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process when logging to a file, or buffered lines are lost.
pub fn init_tracing(config: &LogConfig) -> ConfigResult<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = config.file {
        let file_dir = Path::new(path).parent().unwrap_or(Path::new("."));
        let file_name = Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(DEFAULT_LOG_FILE_NAME);
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let result = if config.json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .try_init()
        } else {
            // No ANSI in files unless asked for.
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(config.ansi.unwrap_or(false));
            registry.with(layer).try_init()
        };
        result.map_err(|e| ConfigError::Logging(e.to_string()))?;
        Some(guard)
    } else {
        let result = if config.json {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = config.ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).try_init()
        };
        result.map_err(|e| ConfigError::Logging(e.to_string()))?;
        None
    };

    info!(
        subsystem = "app",
        log_format = if config.json { "json" } else { "text" },
        log_file = config.file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_defaults_to_text_stdout() {
        let config = LogConfig::from_values(None, None, None);
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_log_config_parses_values() {
        let config = LogConfig::from_values(
            Some("json".to_string()),
            Some("/var/log/supernotes/app.log".to_string()),
            Some("1".to_string()),
        );
        assert!(config.json);
        assert_eq!(config.file.as_deref(), Some("/var/log/supernotes/app.log"));
        assert_eq!(config.ansi, Some(true));
    }

    #[test]
    fn test_empty_log_file_means_stdout() {
        let config = LogConfig::from_values(None, Some(String::new()), Some("false".to_string()));
        assert!(config.file.is_none());
        assert_eq!(config.ansi, Some(false));
    }

    #[test]
    fn test_second_init_is_an_error() {
        let config = LogConfig::default();
        // The first call may race with other tests; only the second must fail.
        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(ConfigError::Logging(_))));
    }
}
