//! Archive index entries.

use std::time::SystemTime;

use crate::zip::{flags, CompressionMethod, DosDateTime};

/// Where the bytes of an entry currently live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Backing {
    /// Stored bytes sit in the source container starting at `offset`.
    Source { offset: usize },
    /// Uncompressed bytes owned by the entry.
    Owned(Vec<u8>),
}

/// Index record for one logical path.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Stored size in bytes. Equals `size` for stored entries.
    pub size_in_archive: u64,
    /// Compression of the stored bytes.
    pub compression: CompressionMethod,
    /// CRC-32 of the uncompressed bytes.
    pub crc32: u32,
    /// Last modification time.
    pub modified: DosDateTime,
    /// Offset of the local header in the source, or in the last output
    /// written by the archive.
    pub local_header_offset: u64,
    /// General purpose flags carried over from the source.
    pub flags: u16,
    /// Name bytes from the source when they are not valid UTF-8.
    pub raw_name: Option<Vec<u8>>,
    pub backing: Backing,
}

impl Entry {
    /// An entry owning `data`, with a provisional store compression.
    pub fn owned(data: Vec<u8>, modified: DosDateTime) -> Self {
        let size = data.len() as u64;
        Self {
            size,
            size_in_archive: size,
            compression: CompressionMethod::Store,
            crc32: packzip_common::crc::hash_bytes(&data),
            modified,
            local_header_offset: 0,
            flags: 0,
            raw_name: None,
            backing: Backing::Owned(data),
        }
    }

    /// Owned uncompressed bytes, if any.
    #[inline]
    pub fn data(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Owned(data) => Some(data),
            Backing::Source { .. } => None,
        }
    }

    /// Name bytes as written into headers.
    pub fn name_bytes<'p>(&'p self, path: &'p str) -> &'p [u8] {
        self.raw_name.as_deref().unwrap_or(path.as_bytes())
    }

    /// General purpose flags for the headers of this entry.
    ///
    /// Source-backed entries keep their flags. Compression options describe
    /// the source stream, so entries compressed anew drop them, and get the
    /// UTF-8 bit when their path needs it.
    pub fn header_flags(&self, path: &str) -> u16 {
        match self.backing {
            Backing::Source { .. } => self.flags,
            Backing::Owned(_) => {
                let mut bits = self.flags & !flags::COMPRESSION_OPTIONS;
                if self.raw_name.is_none() && !path.is_ascii() {
                    bits |= flags::UTF8;
                }
                bits
            }
        }
    }

    pub fn status(&self, path: &str) -> EntryStatus {
        EntryStatus {
            kind: if self.size == 0 && path.ends_with('/') {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            size: self.size,
            size_in_archive: self.size_in_archive,
            compression: self.compression,
            crc32: self.crc32,
            modified: self.modified,
            header_offset: self.local_header_offset,
        }
    }
}

/// Kind of an indexed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EntryKind {
    File,
    Directory,
}

/// Metadata of an archive entry, as reported by [`Archive::status`].
///
/// [`Archive::status`]: crate::Archive::status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntryStatus {
    /// File or directory.
    pub kind: EntryKind,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Stored size in bytes.
    ///
    /// For entries added or loaded since the last write this is provisional
    /// until the archive is written again.
    pub size_in_archive: u64,
    /// Compression of the stored bytes.
    pub compression: CompressionMethod,
    /// CRC-32 of the uncompressed bytes.
    pub crc32: u32,
    /// Last modification time, two-second resolution.
    pub modified: DosDateTime,
    /// Offset of the local header in the source container, or in the output
    /// of the last write. Zero for entries added since.
    pub header_offset: u64,
}

impl EntryStatus {
    /// Check if this entry represents a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Get the last modification time as a SystemTime.
    ///
    /// Returns None if the DOS date/time is invalid.
    pub fn modified_at(&self) -> Option<SystemTime> {
        self.modified.to_system_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_entry_records_checksum() {
        let entry = Entry::owned(b"hello".to_vec(), DosDateTime::default());

        assert_eq!(entry.size, 5);
        assert_eq!(entry.size_in_archive, 5);
        assert_eq!(entry.compression, CompressionMethod::Store);
        assert_eq!(entry.crc32, 0x3610_A686);
        assert_eq!(entry.data(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_status_kind() {
        let empty = Entry::owned(Vec::new(), DosDateTime::default());
        assert!(empty.status("sounds/").is_dir());
        assert!(!empty.status("sounds").is_dir());

        let full = Entry::owned(vec![1], DosDateTime::default());
        assert_eq!(full.status("odd/").kind, EntryKind::File);
    }

    #[test]
    fn test_header_flags() {
        let ascii = Entry::owned(vec![1], DosDateTime::default());
        assert_eq!(ascii.header_flags("plain.txt"), 0);
        assert_eq!(ascii.header_flags("caf\u{e9}.txt"), flags::UTF8);

        let source = Entry {
            flags: flags::UTF8 | 0x0002,
            backing: Backing::Source { offset: 0 },
            ..Entry::owned(Vec::new(), DosDateTime::default())
        };
        assert_eq!(source.header_flags("caf\u{e9}.txt"), flags::UTF8 | 0x0002);

        let loaded = Entry {
            backing: Backing::Owned(vec![1]),
            ..source.clone()
        };
        assert_eq!(loaded.header_flags("caf\u{e9}.txt"), flags::UTF8);

        let undecodable = Entry {
            raw_name: Some(b"caf\x82.txt".to_vec()),
            ..ascii.clone()
        };
        assert_eq!(undecodable.header_flags("caf\u{fffd}.txt"), 0);
        assert_eq!(undecodable.name_bytes("caf\u{fffd}.txt"), b"caf\x82.txt");
        assert_eq!(ascii.name_bytes("plain.txt"), b"plain.txt");
    }

    #[test]
    fn test_source_backed_entry_has_no_data() {
        let entry = Entry {
            backing: Backing::Source { offset: 30 },
            ..Entry::owned(Vec::new(), DosDateTime::default())
        };
        assert!(entry.data().is_none());
    }
}
