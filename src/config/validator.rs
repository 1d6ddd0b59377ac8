//! Configuration validator for mainram-bridge
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{AcquisitionConfig, Config, ConfigError, LoggingConfig, PollingConfig, TransportConfig};
use crate::memory::MAIN_RAM_START;
use crate::registry::AddressTable;
use std::collections::HashSet;

/// End of the largest main RAM window (16 MiB)
const MAIN_RAM_END: u64 = MAIN_RAM_START as u64 + 0x0100_0000;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_transport(&config.transport)?;
        Self::validate_acquisition(&config.acquisition)?;
        Self::validate_polling(&config.polling)?;
        Self::validate_logging(&config.logging)?;
        Self::validate_variants(&config.variants)?;
        Ok(())
    }

    fn validate_transport(transport: &TransportConfig) -> Result<(), ConfigError> {
        if transport.endpoint.is_empty() {
            return Err(ConfigError::Invalid(
                "Transport endpoint cannot be empty".to_string(),
            ));
        }

        if transport.retry_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Endpoint retry interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_acquisition(acquisition: &AcquisitionConfig) -> Result<(), ConfigError> {
        if acquisition.attempts == 0 {
            return Err(ConfigError::Invalid(
                "Scan attempts must be at least 1".to_string(),
            ));
        }

        if acquisition.retry_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Scan retry interval must be greater than 0".to_string(),
            ));
        }

        // Validate thread count
        if acquisition.threads == 0 {
            return Err(ConfigError::Invalid(
                "Scanner threads must be at least 1".to_string(),
            ));
        }

        if acquisition.threads > 128 {
            return Err(ConfigError::Invalid(
                "Scanner threads cannot exceed 128".to_string(),
            ));
        }

        // Validate chunk size (must be power of 2 for alignment)
        if acquisition.chunk_size < 16 || !acquisition.chunk_size.is_power_of_two() {
            return Err(ConfigError::Invalid(
                "Chunk size must be a power of 2 of at least 16 bytes".to_string(),
            ));
        }

        if acquisition.min_region_size < 16 {
            return Err(ConfigError::Invalid(
                "Minimum region size must be at least 16 bytes".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_polling(polling: &PollingConfig) -> Result<(), ConfigError> {
        if polling.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if polling.full_resync_ms < polling.interval_ms {
            return Err(ConfigError::Invalid(
                "Full resync interval cannot be shorter than the poll interval".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        // RUST_LOG-style directives are accepted too; only a bare level is checked here
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        let level = logging.level.to_lowercase();
        if !level.contains('=') && !valid_levels.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        if let Some(file) = &logging.file {
            if file.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "Log file path cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn validate_variants(variants: &[AddressTable]) -> Result<(), ConfigError> {
        let mut tags = HashSet::new();

        for table in variants {
            if table.tag.is_empty() {
                return Err(ConfigError::Invalid("Variant tag cannot be empty".to_string()));
            }
            if !tags.insert(table.tag.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate variant tag: {}",
                    table.tag
                )));
            }
            if table.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Variant {} has no entries",
                    table.tag
                )));
            }

            let mut names = HashSet::new();
            for entry in table.entries() {
                if entry.name.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "Variant {} has an entry without a name",
                        table.tag
                    )));
                }
                if !names.insert(entry.name.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "Variant {} lists {} twice",
                        table.tag, entry.name
                    )));
                }

                let start = entry.address as u64;
                let end = start + entry.width.bytes() as u64;
                if start < MAIN_RAM_START as u64 || end > MAIN_RAM_END {
                    return Err(ConfigError::Invalid(format!(
                        "Variant {}: {} at 0x{:08X} is outside main RAM",
                        table.tag, entry.name, entry.address
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Width;
    use crate::registry::AddressEntry;

    fn invalid(config: &Config) -> String {
        match ConfigValidator::validate(config) {
            Err(ConfigError::Invalid(msg)) => msg,
            other => panic!("expected an invalid configuration, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = Config::default();
        config.polling.interval_ms = 0;
        assert!(invalid(&config).contains("Poll interval"));

        let mut config = Config::default();
        config.acquisition.attempts = 0;
        assert!(invalid(&config).contains("attempts"));

        let mut config = Config::default();
        config.transport.retry_interval_ms = 0;
        assert!(invalid(&config).contains("retry"));
    }

    #[test]
    fn test_zero_grace_period_allowed() {
        let mut config = Config::default();
        config.acquisition.grace_period_ms = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_chunk_size_must_be_power_of_two() {
        let mut config = Config::default();
        config.acquisition.chunk_size = 60_000;
        assert!(invalid(&config).contains("Chunk size"));
    }

    #[test]
    fn test_log_levels() {
        let mut config = Config::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());

        config.logging.level = "mainram_bridge=trace".to_string();
        assert!(validate_config(&config).is_ok());

        config.logging.level = "verbose".to_string();
        assert!(invalid(&config).contains("log level"));
    }

    #[test]
    fn test_variant_rules() {
        let entry = AddressEntry::new("ZENY", 0x020F_3394, Width::Word);

        let mut config = Config::default();
        config.variants = vec![
            AddressTable::new("BA", vec![entry.clone()]),
            AddressTable::new("BA", vec![entry.clone()]),
        ];
        assert!(invalid(&config).contains("Duplicate variant tag"));

        config.variants = vec![AddressTable::new("BA", vec![entry.clone(), entry.clone()])];
        assert!(invalid(&config).contains("twice"));

        config.variants = vec![AddressTable::new(
            "BA",
            vec![AddressEntry::new("FAR", 0x0300_0000, Width::Byte)],
        )];
        assert!(invalid(&config).contains("outside main RAM"));

        config.variants = vec![AddressTable::new(
            "BA",
            vec![AddressEntry::new("EDGE", 0x02FF_FFFE, Width::Word)],
        )];
        assert!(invalid(&config).contains("outside main RAM"));

        config.variants = vec![AddressTable::new("BA", vec![entry])];
        assert!(validate_config(&config).is_ok());
    }
}
