//! Core module containing fundamental types for mainram-bridge
//!
//! This module provides the foundational building blocks used throughout
//! the bridge: host address handling, access widths and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{Address, MemoryError, MemoryResult, Width};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

// Platform verification at compile time
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
compile_error!("mainram-bridge only supports Windows and Linux hosts");

#[cfg(not(target_pointer_width = "64"))]
compile_error!("mainram-bridge requires a 64-bit host process");
