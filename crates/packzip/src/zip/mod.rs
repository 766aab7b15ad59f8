//! ZIP format structures.
//!
//! Fixed-layout records found in a container, expressed with zerocopy's
//! little-endian integer types so that they decode and encode identically on
//! every host. The records are pure layout: none of them validates its own
//! fields.

use std::fmt;

pub mod central_dir;
pub mod dos_time;
mod eocd;
mod local;

pub use central_dir::CentralDirectoryHeader;
pub use dos_time::{DosDate, DosDateTime, DosTime};
pub use eocd::{DigitalSignature, EocdRecord};
pub use local::LocalFileHeader;

/// Version needed to extract (2.0: deflate, folders).
pub const VERSION_NEEDED: u16 = 20;

/// Version made by, as written into central directory records.
pub const VERSION_MADE_BY: u16 = 20;

/// General purpose bit flags.
pub mod flags {
    /// Entry is encrypted.
    pub const ENCRYPTED: u16 = 0x0001;
    /// Compression option bits.
    pub const COMPRESSION_OPTIONS: u16 = 0x0006;
    /// Sizes and CRC follow the data in a descriptor.
    pub const DATA_DESCRIPTOR: u16 = 0x0008;
    /// Name and comment are UTF-8.
    pub const UTF8: u16 = 0x0800;
}

/// Compression methods supported by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u16)]
pub enum CompressionMethod {
    /// No compression (stored).
    Store = 0,
    /// DEFLATE compression.
    Deflate = 8,
}

impl CompressionMethod {
    /// Method code as written in headers.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => f.pad("stored"),
            Self::Deflate => f.pad("deflated"),
        }
    }
}

impl TryFrom<u16> for CompressionMethod {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Store),
            8 => Ok(Self::Deflate),
            other => Err(other),
        }
    }
}
