//! Configuration loader for mainram-bridge
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::ConfigDefaults;
use crate::memory::ScanOptions;
use crate::registry::AddressTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extra address tables, or replacements for built-in ones
    #[serde(default)]
    pub variants: Vec<AddressTable>,
}

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Pipe name on Windows, socket path elsewhere
    #[serde(default = "ConfigDefaults::endpoint")]
    pub endpoint: String,
    #[serde(default = "default_endpoint_retry_ms")]
    pub retry_interval_ms: u64,
    /// Upper bound on teardown when the bridge is stopped
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

/// Main RAM acquisition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "default_scan_attempts")]
    pub attempts: u32,
    #[serde(default = "default_scan_retry_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_min_region_size")]
    pub min_region_size: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "ConfigDefaults::scan_threads")]
    pub threads: usize,
    /// Bytes of main RAM hex-dumped to the log once found
    #[serde(default = "default_dump_bytes")]
    pub dump_bytes: usize,
}

/// Polling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_full_resync_ms")]
    pub full_resync_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl TransportConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl AcquisitionConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            min_region_size: self.min_region_size,
            chunk_size: self.chunk_size,
            threads: self.threads,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn full_resync(&self) -> Duration {
        Duration::from_millis(self.full_resync_ms)
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults only if the file doesn't exist
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from the default location
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new("config.toml").load_or_default()
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            endpoint: ConfigDefaults::endpoint(),
            retry_interval_ms: ConfigDefaults::ENDPOINT_RETRY_MS,
            stop_timeout_ms: ConfigDefaults::STOP_TIMEOUT_MS,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        AcquisitionConfig {
            grace_period_ms: ConfigDefaults::GRACE_PERIOD_MS,
            attempts: ConfigDefaults::SCAN_ATTEMPTS,
            retry_interval_ms: ConfigDefaults::SCAN_RETRY_MS,
            min_region_size: ConfigDefaults::MIN_REGION_SIZE,
            chunk_size: ConfigDefaults::CHUNK_SIZE,
            threads: ConfigDefaults::scan_threads(),
            dump_bytes: ConfigDefaults::DUMP_BYTES,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            interval_ms: ConfigDefaults::POLL_INTERVAL_MS,
            full_resync_ms: ConfigDefaults::FULL_RESYNC_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

// Individual field defaults
fn default_endpoint_retry_ms() -> u64 {
    ConfigDefaults::ENDPOINT_RETRY_MS
}

fn default_stop_timeout_ms() -> u64 {
    ConfigDefaults::STOP_TIMEOUT_MS
}

fn default_grace_period_ms() -> u64 {
    ConfigDefaults::GRACE_PERIOD_MS
}

fn default_scan_attempts() -> u32 {
    ConfigDefaults::SCAN_ATTEMPTS
}

fn default_scan_retry_ms() -> u64 {
    ConfigDefaults::SCAN_RETRY_MS
}

fn default_min_region_size() -> usize {
    ConfigDefaults::MIN_REGION_SIZE
}

fn default_chunk_size() -> usize {
    ConfigDefaults::CHUNK_SIZE
}

fn default_dump_bytes() -> usize {
    ConfigDefaults::DUMP_BYTES
}

fn default_poll_interval_ms() -> u64 {
    ConfigDefaults::POLL_INTERVAL_MS
}

fn default_full_resync_ms() -> u64 {
    ConfigDefaults::FULL_RESYNC_MS
}

fn default_log_level() -> String {
    ConfigDefaults::LOG_LEVEL.to_string()
}
