//! Central Directory Header structures.

use std::io::Write;

use packzip_common::BinaryWriter;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::LocalFileHeader;

/// Central Directory File Header (without signature).
///
/// This structure describes a single entry in the archive's central
/// directory. The 4-byte signature (0x02014b50) is read separately before
/// this struct. It repeats most of the local header and adds the offset of
/// that local header, which is what allows the directory to be parsed
/// without walking the entries themselves.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned,
)]
#[repr(C)]
pub struct CentralDirectoryHeader {
    /// Version made by
    pub version_made_by: U16,
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
    /// File comment length
    pub file_comment_length: U16,
    /// Disk number where file starts
    pub disk_number_start: U16,
    /// Internal file attributes
    pub internal_attrs: U16,
    /// External file attributes
    pub external_attrs: U32,
    /// Relative offset of local file header
    pub local_header_offset: U32,
}

impl CentralDirectoryHeader {
    /// Central Directory signature bytes.
    pub const MAGIC: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];

    /// Central Directory signature as u32.
    pub const SIGNATURE: u32 = 0x02014b50;

    /// Size of the fixed part, excluding the signature.
    pub const SIZE: usize = 42;

    /// Build the directory record describing a local header written at
    /// `local_header_offset`.
    pub fn for_local(local: &LocalFileHeader, version_made_by: u16, local_header_offset: u32) -> Self {
        Self {
            version_made_by: U16::new(version_made_by),
            version_needed: local.version_needed,
            flags: local.flags,
            compression_method: local.compression_method,
            last_mod_time: local.last_mod_time,
            last_mod_date: local.last_mod_date,
            crc32: local.crc32,
            compressed_size: local.compressed_size,
            uncompressed_size: local.uncompressed_size,
            file_name_length: local.file_name_length,
            extra_field_length: U16::ZERO,
            file_comment_length: U16::ZERO,
            disk_number_start: U16::ZERO,
            internal_attrs: U16::ZERO,
            external_attrs: U32::ZERO,
            local_header_offset: U32::new(local_header_offset),
        }
    }

    /// Total variable-length data size following this header.
    pub fn variable_data_size(&self) -> usize {
        self.file_name_length.get() as usize
            + self.extra_field_length.get() as usize
            + self.file_comment_length.get() as usize
    }

    /// Write the signature followed by the fixed fields.
    pub fn write_to<W: Write>(&self, writer: &mut BinaryWriter<W>) -> packzip_common::Result<()> {
        writer.write_u32(Self::SIGNATURE)?;
        writer.write_struct(self)
    }
}
