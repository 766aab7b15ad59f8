//! Local File Header structures.

use std::io::Write;

use packzip_common::BinaryWriter;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Local File Header (without signature).
///
/// This structure precedes the stored bytes of every entry. The 4-byte
/// signature (0x04034b50) is read separately before this struct; the file
/// name and extra field follow it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct LocalFileHeader {
    /// Version needed to extract
    pub version_needed: U16,
    /// General purpose bit flag
    pub flags: U16,
    /// Compression method
    pub compression_method: U16,
    /// Last modification time (DOS format)
    pub last_mod_time: U16,
    /// Last modification date (DOS format)
    pub last_mod_date: U16,
    /// CRC-32 of uncompressed data
    pub crc32: U32,
    /// Compressed size
    pub compressed_size: U32,
    /// Uncompressed size
    pub uncompressed_size: U32,
    /// File name length
    pub file_name_length: U16,
    /// Extra field length
    pub extra_field_length: U16,
}

impl LocalFileHeader {
    /// Local File Header signature bytes.
    pub const MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

    /// Local File Header signature as u32.
    pub const SIGNATURE: u32 = 0x04034b50;

    /// Size of the fixed part, excluding the signature.
    pub const SIZE: usize = 26;

    /// Total variable-length data size following this header.
    pub fn variable_data_size(&self) -> usize {
        self.file_name_length.get() as usize + self.extra_field_length.get() as usize
    }

    /// Write the signature followed by the fixed fields.
    pub fn write_to<W: Write>(&self, writer: &mut BinaryWriter<W>) -> packzip_common::Result<()> {
        writer.write_u32(Self::SIGNATURE)?;
        writer.write_struct(self)
    }
}
