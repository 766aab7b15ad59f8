//! Common utilities for packzip.
//!
//! This crate provides the byte-level plumbing used by the archive crate:
//!
//! - [`BinaryReader`] - Zero-copy little-endian reading from byte slices
//! - [`BinaryWriter`] - Position-tracking little-endian writing to any sink
//! - [`crc`] - CRC-32 (IEEE) checksums as used by ZIP containers

mod error;
mod reader;
mod writer;

pub mod crc;

pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
