//! Configuration module for mainram-bridge
//!
//! Provides configuration loading, validation, and default settings
//! for the bridge.

mod defaults;
mod loader;
mod validator;

pub use defaults::ConfigDefaults;
pub use loader::{
    load_config, AcquisitionConfig, ConfigLoader, LoggingConfig, PollingConfig, TransportConfig,
};
pub use validator::{validate_config, ConfigValidator};

// Re-export the main configuration structure
pub use loader::Config;

// Configuration-related error type
pub use loader::ConfigError;

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
