//! End of Central Directory (EOCD) structures.

use std::io::Write;

use packzip_common::BinaryWriter;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// End of Central Directory Record (without signature).
///
/// This is the fixed trailer found at the end of the archive, optionally
/// followed by a comment. The 4-byte signature (0x06054b50) is read
/// separately before this struct.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct EocdRecord {
    /// Number of this disk
    pub disk_number: U16,
    /// Disk where central directory starts
    pub central_dir_disk: U16,
    /// Number of central directory records on this disk
    pub central_dir_count_disk: U16,
    /// Total number of central directory records
    pub central_dir_count_total: U16,
    /// Size of central directory (bytes)
    pub central_dir_size: U32,
    /// Offset of start of central directory
    pub central_dir_offset: U32,
    /// Comment length
    pub comment_length: U16,
}

impl EocdRecord {
    /// EOCD signature bytes.
    pub const MAGIC: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];

    /// EOCD signature as u32.
    pub const SIGNATURE: u32 = 0x06054b50;

    /// Size of the record including its signature, excluding the comment.
    pub const SIZE_WITH_SIGNATURE: usize = 22;

    /// Record for a single-volume archive with no comment.
    pub fn single_disk(entry_count: u16, central_dir_size: u32, central_dir_offset: u32) -> Self {
        Self {
            disk_number: U16::ZERO,
            central_dir_disk: U16::ZERO,
            central_dir_count_disk: U16::new(entry_count),
            central_dir_count_total: U16::new(entry_count),
            central_dir_size: U32::new(central_dir_size),
            central_dir_offset: U32::new(central_dir_offset),
            comment_length: U16::ZERO,
        }
    }

    /// Write the signature followed by the fixed fields.
    pub fn write_to<W: Write>(&self, writer: &mut BinaryWriter<W>) -> packzip_common::Result<()> {
        writer.write_u32(Self::SIGNATURE)?;
        writer.write_struct(self)
    }
}

/// Digital signature record (without signature).
///
/// Written after the end record with an empty payload.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct DigitalSignature {
    /// Length of the signature data that follows
    pub data_length: U16,
}

impl DigitalSignature {
    /// Digital signature record signature as u32.
    pub const SIGNATURE: u32 = 0x05054b50;

    /// Write the signature followed by the fixed fields.
    pub fn write_to<W: Write>(&self, writer: &mut BinaryWriter<W>) -> packzip_common::Result<()> {
        writer.write_u32(Self::SIGNATURE)?;
        writer.write_struct(self)
    }
}
