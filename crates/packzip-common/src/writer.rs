//! Binary writer for serializing little-endian data.
//!
//! [`BinaryWriter`] wraps any [`std::io::Write`] sink and keeps track of how
//! many bytes have gone through it, so callers can record offsets of the
//! records they emit without requiring a seekable sink.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use zerocopy::{Immutable, IntoBytes};

use crate::Result;

/// A position-tracking little-endian writer.
///
/// # Example
///
/// ```
/// use packzip_common::BinaryWriter;
///
/// let mut writer = BinaryWriter::new(Vec::new());
/// writer.write_u32(0x05054b50).unwrap();
/// writer.write_u16(0).unwrap();
///
/// assert_eq!(writer.position(), 6);
/// assert_eq!(writer.into_inner(), b"PK\x05\x05\x00\x00");
/// ```
#[derive(Debug)]
pub struct BinaryWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new writer positioned at zero.
    #[inline]
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    /// Write a little-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        self.position += 2;
        Ok(())
    }

    /// Write a little-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    /// Write a fixed-layout record using zerocopy.
    #[inline]
    pub fn write_struct<T: IntoBytes + Immutable>(&mut self, value: &T) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Consume the writer, returning the underlying sink.
    #[inline]
    pub fn into_inner(self) -> W {
        self.inner
    }
}
