//! Custom error types for mainram-bridge

use std::fmt;
use thiserror::Error;

/// Error type for host memory access and region queries
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Failed to read memory at {address}: {reason}")]
    ReadFailed { address: String, reason: String },

    #[error("Failed to write memory at {address}: {reason}")]
    WriteFailed { address: String, reason: String },

    #[error("Unsupported access width: {0} bytes")]
    UnsupportedWidth(u8),

    #[error("Main RAM has not been located yet")]
    TargetNotAcquired,

    #[error("Region query failed: {0}")]
    QueryFailed(String),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a read failed error
    pub fn read_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ReadFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a write failed error
    pub fn write_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::WriteFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// True for faults raised by the access itself (as opposed to lookups)
    pub fn is_access_fault(&self) -> bool {
        matches!(
            self,
            MemoryError::ReadFailed { .. } | MemoryError::WriteFailed { .. }
        )
    }
}
