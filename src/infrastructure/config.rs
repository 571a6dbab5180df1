//! Configuration management for the ingest service
//!
//! Loads configuration from config.toml at startup.
//! All values are configurable to avoid hardcoded constants.

use crate::decode::DecodeOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use time::UtcOffset;

/// Service configuration
///
/// Loaded from config.toml at startup. Every section falls back to its
/// defaults when absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub decode: DecodeConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stock cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Quiet period before a "data changed" notification fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Quote count above which a warning is logged (never enforced)
    #[serde(default = "default_soft_limit")]
    pub soft_limit: usize,
}

/// Record decoding settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecodeConfig {
    /// Exchange-local offset applied to driver timestamps
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i8,

    /// Per-packet record errors logged before going quiet
    #[serde(default = "default_max_logged_errors")]
    pub max_logged_errors: usize,

    /// Declared counts above this are treated as corrupt and clamped
    #[serde(default = "default_max_records")]
    pub max_records_per_packet: usize,

    /// Count used in place of an implausible declared count
    #[serde(default = "default_clamp_records")]
    pub clamp_records_to: usize,
}

/// Packet queue settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Capacity of the realtime (quote) queue
    #[serde(default = "default_queue_capacity")]
    pub realtime_capacity: usize,

    /// Capacity of the queue for every other family
    #[serde(default = "default_queue_capacity")]
    pub other_capacity: usize,

    /// Non-realtime packets drained per worker round
    #[serde(default = "default_other_batch")]
    pub other_batch: usize,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "info,decode=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Root directory for rolling log files
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            soft_limit: default_soft_limit(),
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            max_logged_errors: default_max_logged_errors(),
            max_records_per_packet: default_max_records(),
            clamp_records_to: default_clamp_records(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            realtime_capacity: default_queue_capacity(),
            other_capacity: default_queue_capacity(),
            other_batch: default_other_batch(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: default_log_directory(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_soft_limit() -> usize {
    50_000
}

fn default_utc_offset_hours() -> i8 {
    8 // exchange local time, UTC+8
}

fn default_max_logged_errors() -> usize {
    3
}

fn default_max_records() -> usize {
    100_000
}

fn default_clamp_records() -> usize {
    10_000
}

fn default_queue_capacity() -> usize {
    5_000
}

fn default_other_batch() -> usize {
    50
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

impl Config {
    /// Load configuration from config.toml file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed or fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.debounce_ms == 0 {
            return Err(ConfigError::Invalid("cache.debounce_ms must be > 0".into()));
        }
        if self.queue.realtime_capacity == 0 || self.queue.other_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacities must be > 0".into()));
        }
        if self.queue.other_batch == 0 {
            return Err(ConfigError::Invalid("queue.other_batch must be > 0".into()));
        }
        if !(-12..=14).contains(&self.decode.utc_offset_hours) {
            return Err(ConfigError::Invalid(format!(
                "decode.utc_offset_hours out of range: {}",
                self.decode.utc_offset_hours
            )));
        }
        if self.decode.clamp_records_to == 0
            || self.decode.clamp_records_to > self.decode.max_records_per_packet
        {
            return Err(ConfigError::Invalid(
                "decode.clamp_records_to must be in 1..=max_records_per_packet".into(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.cache.debounce_ms)
    }

    /// Decoder options derived from the `[decode]` section
    pub fn decode_options(&self) -> Result<DecodeOptions, ConfigError> {
        let utc_offset = UtcOffset::from_hms(self.decode.utc_offset_hours, 0, 0)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(DecodeOptions {
            utc_offset,
            max_logged_errors: self.decode.max_logged_errors,
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML)
    ParseError(String),
    /// Well-formed but unusable value
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(_) | ConfigError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.cache.debounce_ms, 500);
        assert_eq!(config.cache.soft_limit, 50_000);
        assert_eq!(config.decode.utc_offset_hours, 8);
        assert_eq!(config.decode.max_logged_errors, 3);
        assert_eq!(config.queue.realtime_capacity, 5_000);
        assert_eq!(config.queue.other_batch, 50);
        assert_eq!(config.api.port, 5000);
        assert_eq!(config.logging.directory, PathBuf::from("logs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [cache]
            debounce_ms = 250

            [api]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.debounce_interval(), Duration::from_millis(250));
        assert_eq!(config.cache.soft_limit, 50_000);
        assert!(!config.api.enabled);
        assert_eq!(config.api.port, 5000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml("[cache]\ndebounce_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[decode]\nutc_offset_hours = 20"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[queue]\nother_batch = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[cache\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_decode_options() {
        let mut config = Config::default();
        config.decode.utc_offset_hours = -5;
        config.decode.max_logged_errors = 7;
        let opts = config.decode_options().unwrap();
        assert_eq!(opts.utc_offset.whole_hours(), -5);
        assert_eq!(opts.max_logged_errors, 7);
    }
}
