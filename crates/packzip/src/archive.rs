//! Archive index and reader.
//!
//! An [`Archive`] is built either empty or by scanning the central directory
//! of a source container held in memory (a `Vec`, a memory map, ...). Entries
//! scanned from the source stay there until they are read; entries added in
//! memory own their uncompressed bytes until the archive is written.

use indexmap::IndexMap;
use packzip_common::BinaryReader;
use tracing::{debug, trace};

use crate::codec;
use crate::entry::{Backing, Entry, EntryStatus};
use crate::options::ArchiveOptions;
use crate::zip::{
    flags, CentralDirectoryHeader, CompressionMethod, DosDateTime, EocdRecord, LocalFileHeader,
};
use crate::{Error, Result};

/// A ZIP-compatible archive.
///
/// The index preserves insertion order: entries scanned from a source keep
/// their central directory order, new paths are appended, and replacing an
/// existing path keeps its position.
pub struct Archive<'a> {
    /// Source container, present when the archive was opened from bytes.
    pub(crate) source: Option<&'a [u8]>,
    /// Entry metadata by path.
    pub(crate) index: IndexMap<String, Entry>,
    pub(crate) options: ArchiveOptions,
}

impl<'a> Archive<'a> {
    /// Create an empty archive with default options.
    pub fn new() -> Self {
        Self::with_options(ArchiveOptions::default())
    }

    /// Create an empty archive.
    pub fn with_options(options: ArchiveOptions) -> Self {
        Self {
            source: None,
            index: IndexMap::new(),
            options,
        }
    }

    /// Index an existing container with default options.
    ///
    /// Every entry is validated up front: unsupported compression methods
    /// and encrypted entries make the whole open fail.
    pub fn open(source: &'a [u8]) -> Result<Self> {
        Self::open_with_options(source, ArchiveOptions::default())
    }

    /// Index an existing container.
    pub fn open_with_options(source: &'a [u8], options: ArchiveOptions) -> Result<Self> {
        let index = Self::parse_index(source, &options)?;

        Ok(Self {
            source: Some(source),
            index,
            options,
        })
    }

    /// Get the options in effect.
    #[inline]
    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Get the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check whether the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check whether `path` is in the index.
    #[inline]
    pub fn has(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Iterate over indexed paths in index order.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.keys().map(String::as_str)
    }

    /// Iterate over paths and their status in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, EntryStatus)> + '_ {
        self.index
            .iter()
            .map(|(path, entry)| (path.as_str(), entry.status(path)))
    }

    /// Get the status of an entry.
    pub fn status(&self, path: &str) -> Result<EntryStatus> {
        self.entry(path).map(|entry| entry.status(path))
    }

    /// Read the uncompressed contents of an entry.
    ///
    /// Entries owning their bytes return a copy of them; entries backed by
    /// the source are copied or inflated from it. The index is not touched.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self.entry(path)?;
        self.decode(path, entry)
    }

    /// Read an entry and keep the uncompressed bytes in the index.
    ///
    /// A loaded entry no longer refers to the source and is compressed anew
    /// the next time the archive is written.
    pub fn load(&mut self, path: &str) -> Result<&[u8]> {
        let idx = self
            .index
            .get_index_of(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        if matches!(self.index[idx].backing, Backing::Source { .. }) {
            let data = self.decode(path, &self.index[idx])?;
            trace!(path, size = data.len(), "entry loaded into memory");
            self.index[idx].backing = Backing::Owned(data);
        }

        Ok(self.index[idx].data().unwrap_or_default())
    }

    /// Get the stored (possibly compressed) bytes of a source-backed entry.
    ///
    /// Returns `None` for entries that own their bytes.
    pub fn raw(&self, path: &str) -> Result<Option<&'a [u8]>> {
        let entry = self.entry(path)?;
        match entry.backing {
            Backing::Source { offset } => {
                self.source_range(path, offset, entry.size_in_archive).map(Some)
            }
            Backing::Owned(_) => Ok(None),
        }
    }

    /// Add or replace an entry, stamped with the current time.
    pub fn add(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.add_with_modified(path, data, DosDateTime::now());
    }

    /// Add or replace an entry with an explicit modification time.
    ///
    /// The checksum is computed immediately; compression is decided when
    /// the archive is written.
    pub fn add_with_modified(
        &mut self,
        path: impl Into<String>,
        data: impl Into<Vec<u8>>,
        modified: DosDateTime,
    ) {
        let path = path.into();
        let entry = Entry::owned(data.into(), modified);
        trace!(path = %path, size = entry.size, crc32 = entry.crc32, "entry added");
        self.index.insert(path, entry);
    }

    /// Remove an entry.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        if self.index.shift_remove(path).is_none() {
            return Err(Error::NotFound(path.to_string()));
        }
        trace!(path, "entry removed");
        Ok(())
    }

    /// Remove every entry. The source is left untouched.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Read many entries in parallel.
    ///
    /// Results are returned in the order of `paths`.
    #[cfg(feature = "parallel")]
    pub fn read_parallel(&self, paths: &[&str]) -> Vec<Result<Vec<u8>>> {
        use rayon::prelude::*;

        paths.par_iter().map(|path| self.read(path)).collect()
    }

    // Internal methods

    #[inline]
    fn entry(&self, path: &str) -> Result<&Entry> {
        self.index
            .get(path)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// Slice `len` bytes of the source starting at `offset`.
    pub(crate) fn source_range(&self, path: &str, offset: usize, len: u64) -> Result<&'a [u8]> {
        let out_of_bounds = || Error::EntryOutOfBounds {
            path: path.to_string(),
        };

        let source = self.source.ok_or_else(out_of_bounds)?;
        let len = usize::try_from(len).map_err(|_| out_of_bounds())?;
        let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;

        source.get(offset..end).ok_or_else(out_of_bounds)
    }

    fn decode(&self, path: &str, entry: &Entry) -> Result<Vec<u8>> {
        let offset = match &entry.backing {
            Backing::Owned(data) => return Ok(data.clone()),
            Backing::Source { offset } => *offset,
        };

        if entry.size == 0 {
            return Ok(Vec::new());
        }

        let data = match entry.compression {
            CompressionMethod::Store => self.source_range(path, offset, entry.size)?.to_vec(),
            CompressionMethod::Deflate => {
                let compressed = self.source_range(path, offset, entry.size_in_archive)?;
                codec::decompress(compressed, entry.size as usize)?
            }
        };

        if self.options.verify_crc {
            let actual = packzip_common::crc::hash_bytes(&data);
            if actual != entry.crc32 {
                return Err(Error::ChecksumMismatch {
                    path: path.to_string(),
                    expected: entry.crc32,
                    actual,
                });
            }
        }

        Ok(data)
    }

    /// Parse the central directory of `data` into an index.
    fn parse_index(data: &[u8], options: &ArchiveOptions) -> Result<IndexMap<String, Entry>> {
        let eocd_offset = Self::find_eocd(data, options.max_comment_size)?;
        let mut reader = BinaryReader::new_at(data, eocd_offset + 4);
        let eocd: EocdRecord = reader.read_struct()?;

        let total_entries = eocd.central_dir_count_total.get();
        let disk_entries = eocd.central_dir_count_disk.get();

        // All entries must be in this one container.
        if total_entries != disk_entries {
            return Err(Error::MultiPartUnsupported {
                disk_entries,
                total_entries,
            });
        }

        debug!(
            eocd_offset,
            entries = total_entries,
            central_dir_offset = eocd.central_dir_offset.get(),
            central_dir_size = eocd.central_dir_size.get(),
            "located central directory"
        );

        let mut index = IndexMap::with_capacity(total_entries as usize);
        let mut folders = 0usize;
        reader.seek(eocd.central_dir_offset.get() as usize);

        for _ in 0..total_entries {
            match Self::read_cd_entry(data, &mut reader)? {
                Some((name, entry)) => {
                    index.insert(name, entry);
                }
                None => folders += 1,
            }
        }

        debug!(files = index.len(), folders, "archive index built");

        Ok(index)
    }

    /// Find the end of central directory record by scanning backwards.
    ///
    /// The record may be followed by a comment shorter than
    /// `max_comment_size` bytes.
    fn find_eocd(data: &[u8], max_comment_size: usize) -> Result<usize> {
        let fixed = EocdRecord::SIZE_WITH_SIGNATURE;
        if data.len() < fixed || max_comment_size == 0 {
            return Err(Error::MissingCentralDirectory);
        }

        let latest = data.len() - fixed;
        let earliest = latest.saturating_sub(max_comment_size - 1);
        let window = &data[earliest..latest + EocdRecord::MAGIC.len()];

        memchr::memmem::rfind(window, &EocdRecord::MAGIC)
            .map(|pos| earliest + pos)
            .ok_or(Error::MissingCentralDirectory)
    }

    /// Read one central directory record.
    ///
    /// Returns `None` for folder placeholders.
    fn read_cd_entry(data: &[u8], reader: &mut BinaryReader) -> Result<Option<(String, Entry)>> {
        let offset = reader.position();
        let sig = reader
            .read_u32()
            .map_err(|_| Error::CorruptCentralDirectory { offset })?;
        if sig != CentralDirectoryHeader::SIGNATURE {
            return Err(Error::CorruptCentralDirectory { offset });
        }

        let header: CentralDirectoryHeader = reader.read_struct()?;
        let name_bytes = reader.read_bytes(header.file_name_length.get() as usize)?;
        // Undecodable names are indexed lossily; their bytes are kept for
        // writing.
        let (name, raw_name) = match std::str::from_utf8(name_bytes) {
            Ok(name) => (name.to_owned(), None),
            Err(_) => (
                String::from_utf8_lossy(name_bytes).into_owned(),
                Some(name_bytes.to_vec()),
            ),
        };

        // Skip extra field and comment.
        reader.advance(
            header.extra_field_length.get() as usize + header.file_comment_length.get() as usize,
        );

        if name.ends_with('/') && header.uncompressed_size.get() == 0 {
            trace!(name = %name, "skipping folder");
            return Ok(None);
        }

        let compression = CompressionMethod::try_from(header.compression_method.get()).map_err(
            |method| Error::UnsupportedCompression {
                path: name.clone(),
                method,
            },
        )?;

        if header.flags.get() & flags::ENCRYPTED != 0 {
            return Err(Error::EncryptionUnsupported { path: name });
        }

        // The local header may carry a different extra field than the
        // central record, so the data offset comes from the local header.
        let local_header_offset = header.local_header_offset.get() as usize;
        let mut local_reader = BinaryReader::new_at(data, local_header_offset);
        let local_sig = local_reader.read_u32()?;
        if local_sig != LocalFileHeader::SIGNATURE {
            return Err(Error::InvalidSignature {
                expected: LocalFileHeader::SIGNATURE,
                actual: local_sig,
            });
        }
        let local: LocalFileHeader = local_reader.read_struct()?;
        let data_offset = local_reader.position() + local.variable_data_size();

        trace!(
            name = %name,
            size = header.uncompressed_size.get(),
            stored = header.compressed_size.get(),
            ?compression,
            data_offset,
            "indexed entry"
        );

        let entry = Entry {
            size: header.uncompressed_size.get() as u64,
            size_in_archive: header.compressed_size.get() as u64,
            compression,
            crc32: header.crc32.get(),
            modified: DosDateTime::from_packed(
                header.last_mod_date.get(),
                header.last_mod_time.get(),
            ),
            local_header_offset: local_header_offset as u64,
            // Written headers always carry the sizes.
            flags: header.flags.get() & !flags::DATA_DESCRIPTOR,
            raw_name,
            backing: Backing::Source {
                offset: data_offset,
            },
        };

        Ok(Some((name, entry)))
    }
}

impl Default for Archive<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Archive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("source", &self.source.map(<[u8]>::len))
            .field("entries", &self.index.len())
            .finish()
    }
}
