//! Error types for norstore-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// What exactly failed an integrity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptKind {
    /// Header magic does not match
    Magic,
    /// Stored header length does not equal the compiled header size
    HeaderLength,
    /// Stored payload length is zero or runs past the region bounds
    PayloadLength,
    /// Recomputed header CRC32 does not match the stored value
    HeaderCrc,
    /// Recomputed payload CRC32 does not match the stored value
    PayloadCrc,
    /// Read-back after programming does not match what was written
    Readback,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The transport's completion flag never rose within the spin budget.
    /// A hard I/O failure; callers must not retry automatically.
    BusTimeout,
    /// Write-enable-latch or write-in-progress polling exhausted its budget
    DeviceNotReady,
    /// JEDEC ID does not match the compiled vendor profile
    Unsupported,
    /// Header region reads as erased flash (all ones) - no object here
    NotFound,
    /// Magic/length/CRC mismatch on header or payload, or a failed
    /// read-back verification after programming
    Corrupt(CorruptKind),
    /// Payload larger than the destination buffer, or an address range
    /// beyond the configured capacity
    CapacityExceeded,
}

impl fmt::Display for CorruptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Magic => write!(f, "bad header magic"),
            Self::HeaderLength => write!(f, "header length mismatch"),
            Self::PayloadLength => write!(f, "invalid payload length"),
            Self::HeaderCrc => write!(f, "header CRC mismatch"),
            Self::PayloadCrc => write!(f, "payload CRC mismatch"),
            Self::Readback => write!(f, "read-back verification mismatch"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusTimeout => write!(f, "QSPI transfer timed out"),
            Self::DeviceNotReady => write!(f, "flash device not ready"),
            Self::Unsupported => write!(f, "flash device not supported"),
            Self::NotFound => write!(f, "no object stored at this address"),
            Self::Corrupt(kind) => write!(f, "stored object corrupt: {}", kind),
            Self::CapacityExceeded => write!(f, "capacity exceeded"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
