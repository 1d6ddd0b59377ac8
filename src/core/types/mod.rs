//! Core type definitions for mainram-bridge
//!
//! This module contains the fundamental types shared by every layer:
//! host address wrappers, value widths and error types.

mod address;
mod error;
mod width;

// Re-export all public types
pub use address::Address;
pub use error::{MemoryError, MemoryResult};
pub use width::Width;

/// Address in the emulated console's bus space (0x02000000 upward)
pub type TargetAddress = u32;
