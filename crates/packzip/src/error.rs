//! Error types for the packzip crate.

use thiserror::Error;

/// Errors that can occur when working with archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (usually a truncated record).
    #[error("{0}")]
    Common(#[from] packzip_common::Error),

    /// The end of central directory record was not found in the scan window.
    #[error("could not locate the central directory of the archive")]
    MissingCentralDirectory,

    /// The archive is split across several volumes.
    #[error("multipart archives are not supported ({disk_entries} of {total_entries} entries on this disk)")]
    MultiPartUnsupported { disk_entries: u16, total_entries: u16 },

    /// A central directory record does not start with the expected signature.
    #[error("corrupt central directory at offset {offset}")]
    CorruptCentralDirectory { offset: usize },

    /// A record signature did not match.
    #[error("invalid ZIP signature: expected {expected:#010x}, got {actual:#010x}")]
    InvalidSignature { expected: u32, actual: u32 },

    /// Entry uses a compression method other than store or deflate.
    #[error("entry '{path}' uses an unsupported compression method ({method})")]
    UnsupportedCompression { path: String, method: u16 },

    /// Entry is encrypted.
    #[error("entry '{path}' is encrypted and thus cannot be read")]
    EncryptionUnsupported { path: String },

    /// Entry not found.
    #[error("entry '{0}' not found in the archive")]
    NotFound(String),

    /// Decompression failed or produced the wrong amount of data.
    #[error("inflate failed: {0}")]
    Inflate(String),

    /// Compression failed.
    #[error("deflate failed: {0}")]
    Deflate(String),

    /// Decompressed data does not match the recorded checksum.
    #[error("checksum mismatch in '{path}': expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },

    /// The recorded data range of an entry lies outside the source.
    #[error("data of entry '{path}' is out of bounds")]
    EntryOutOfBounds { path: String },

    /// The archive does not fit the classic (non-ZIP64) container limits.
    #[error("archive too large: {0}")]
    CapacityExceeded(&'static str),
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
