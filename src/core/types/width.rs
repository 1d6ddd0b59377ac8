//! Access widths for tracked values

use super::error::MemoryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a tracked value in bytes
///
/// Values of every width travel in a zero-extended `u32` carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    /// Number of bytes covered by this width
    pub const fn bytes(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Half => 2,
            Width::Word => 4,
        }
    }

    /// Bit mask selecting the low `bytes()` bytes of a carrier
    pub const fn value_mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Half => 0xFFFF,
            Width::Word => 0xFFFF_FFFF,
        }
    }

    /// Decodes a little-endian value of this width, zero-extended
    pub fn decode(self, bytes: &[u8]) -> u32 {
        let mut buf = [0u8; 4];
        let len = self.bytes().min(bytes.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        u32::from_le_bytes(buf)
    }

    /// Encodes the low bytes of `value` in little-endian order
    pub fn encode(self, value: u32) -> Vec<u8> {
        value.to_le_bytes()[..self.bytes()].to_vec()
    }
}

impl TryFrom<u8> for Width {
    type Error = MemoryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Width::Byte),
            2 => Ok(Width::Half),
            4 => Ok(Width::Word),
            other => Err(MemoryError::UnsupportedWidth(other)),
        }
    }
}

impl From<Width> for u8 {
    fn from(width: Width) -> Self {
        width.bytes() as u8
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}
