//! Logging subsystem for TrustMesh
//!
//! Thin setup over `tracing-subscriber`. The library itself only emits
//! `tracing` events; installing a subscriber is the host's choice.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

mod error;
mod level;

pub use error::LoggingError;
pub use level::LogLevel;

/// Configuration for the logging subsystem
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// The minimum log level to display
    pub level: LogLevel,
    /// Whether to include timestamps
    pub with_timestamp: bool,
    /// Whether to include target module information
    pub with_target: bool,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            with_timestamp: true,
            with_target: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Create a new LogConfig with specified level
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Build from the `[logging]` section of the main config
    pub fn from_config(config: &LoggingConfig) -> Result<Self, LoggingError> {
        let level: LogLevel = config.level.parse()?;
        Ok(Self::new(level)
            .with_timestamp(config.with_timestamp)
            .with_target(config.with_target)
            .json_format(config.json_format))
    }

    /// Set whether to include timestamps
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.with_timestamp = enabled;
        self
    }

    /// Set whether to include target information
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Set whether to use JSON formatting
    pub fn json_format(mut self, enabled: bool) -> Self {
        self.json_format = enabled;
        self
    }
}

/// Initialize the logging subsystem with default configuration
///
/// # Example
/// ```
/// use trustmesh_core::logging::init_logging;
///
/// init_logging().expect("Failed to initialize logging");
/// ```
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize the logging subsystem with custom configuration
///
/// `RUST_LOG` takes precedence over `config.level` when set.
///
/// # Example
/// ```
/// use trustmesh_core::logging::{init_logging_with_config, LogConfig, LogLevel};
///
/// let config = LogConfig::new(LogLevel::Debug)
///     .with_timestamp(true)
///     .with_target(false);
///
/// init_logging_with_config(config).expect("Failed to initialize logging");
/// ```
pub fn init_logging_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.with_target);

    let installed = match (config.json_format, config.with_timestamp) {
        (true, true) => builder.json().try_init(),
        (true, false) => builder.json().without_time().try_init(),
        (false, true) => builder.try_init(),
        (false, false) => builder.without_time().try_init(),
    };

    installed.map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(matches!(config.level, LogLevel::Info));
        assert!(config.with_timestamp);
        assert!(config.with_target);
        assert!(!config.json_format);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new(LogLevel::Debug)
            .with_timestamp(false)
            .with_target(false)
            .json_format(true);

        assert!(matches!(config.level, LogLevel::Debug));
        assert!(!config.with_timestamp);
        assert!(!config.with_target);
        assert!(config.json_format);
    }

    #[test]
    fn test_from_logging_section() {
        let section = LoggingConfig {
            level: "WARNING".to_string(),
            json_format: true,
            with_timestamp: false,
            with_target: true,
        };
        let config = LogConfig::from_config(&section).unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert!(config.json_format);
        assert!(!config.with_timestamp);

        let bad = LoggingConfig { level: "loud".to_string(), ..section };
        assert!(matches!(LogConfig::from_config(&bad), Err(LoggingError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_second_init_fails() {
        // Whichever test installs first wins; the next attempt must report it
        let _ = init_logging_with_config(LogConfig::new(LogLevel::Error));
        assert!(init_logging_with_config(LogConfig::new(LogLevel::Error)).is_err());
    }
}
