//! mainram-bridge library
//!
//! Locates an emulator's main RAM inside the process hosting this library,
//! tracks a table of named values living there, and streams their changes to
//! a single client over a local pipe while accepting edit commands.

pub mod config;
pub mod core;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod logging;
pub mod memory;
pub mod process;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod transport;
#[cfg(windows)]
pub mod windows;

// Re-export main types from core module
pub use crate::core::types::{Address, MemoryError, MemoryResult, TargetAddress, Width};

pub use config::Config;
pub use memory::{FaultIsolatedAccess, HostMemory, RegionQuery};
pub use process::HostProcess;
pub use session::Bridge;

// Re-export core directly for full access
pub use crate::core::*;
