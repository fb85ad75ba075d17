//! Configuration management for TrustMesh
//!
//! Defaults, TOML files and `TRUSTMESH_<SECTION>_<KEY>` environment
//! overrides, validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Group registry storage
    pub registry: RegistryConfig,

    /// Proof verification limits
    pub auth: AuthConfig,

    /// Sync batching
    pub partition: PartitionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Registry storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// SQLite database file; in-memory when absent
    pub database_path: Option<PathBuf>,

    /// Connection pool size
    pub pool_size: u32,

    /// How long a writer waits for a locked database
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

/// Auth proof configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Proofs larger than this are rejected before parsing
    pub max_proof_bytes: usize,
}

/// Partition routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Maximum messages per routed batch
    pub max_batch_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Describe metrics at startup
    pub enabled: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            pool_size: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// File-backed registry at `path`
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            pool_size: 4,
            ..Self::default()
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { max_proof_bytes: 16 * 1024 }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self { max_batch_size: 256 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn parse_var<T>(value: &str, what: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", what, e)))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: TRUSTMESH_<SECTION>_<KEY>
    /// Example: TRUSTMESH_REGISTRY_DATABASE_PATH=/var/lib/trustmesh/registry.db
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TRUSTMESH_*` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        // Registry config
        if let Some(path) = lookup("TRUSTMESH_REGISTRY_DATABASE_PATH") {
            self.registry.database_path = Some(PathBuf::from(path));
        }
        if let Some(size) = lookup("TRUSTMESH_REGISTRY_POOL_SIZE") {
            self.registry.pool_size = parse_var(&size, "pool size")?;
        }
        if let Some(ms) = lookup("TRUSTMESH_REGISTRY_BUSY_TIMEOUT_MS") {
            self.registry.busy_timeout = Duration::from_millis(parse_var(&ms, "busy timeout")?);
        }

        // Auth config
        if let Some(max) = lookup("TRUSTMESH_AUTH_MAX_PROOF_BYTES") {
            self.auth.max_proof_bytes = parse_var(&max, "proof size limit")?;
        }

        // Partition config
        if let Some(max) = lookup("TRUSTMESH_PARTITION_MAX_BATCH_SIZE") {
            self.partition.max_batch_size = parse_var(&max, "batch size")?;
        }

        // Logging config
        if let Some(level) = lookup("TRUSTMESH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("TRUSTMESH_LOG_JSON") {
            self.logging.json_format = parse_var(&json, "JSON flag")?;
        }

        // Metrics config
        if let Some(enabled) = lookup("TRUSTMESH_METRICS_ENABLED") {
            self.metrics.enabled = parse_var(&enabled, "metrics flag")?;
        }

        Ok(())
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::FileRead { path: path.to_path_buf(), source })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate registry config
        if self.registry.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        // Every pooled connection to ":memory:" would open its own database
        if self.registry.database_path.is_none() && self.registry.pool_size != 1 {
            return Err(ConfigError::ValidationFailed(
                "in-memory registry requires pool_size = 1".to_string(),
            ));
        }

        // Validate auth config
        if self.auth.max_proof_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_proof_bytes must be greater than 0".to_string(),
            ));
        }

        // Validate partition config
        if self.partition.max_batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }

        // Validate logging config
        if crate::logging::LogLevel::parse(&self.logging.level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents)
            .map_err(|source| ConfigError::FileWrite { path: path.to_path_buf(), source })
    }
}
