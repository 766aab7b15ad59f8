//! ZIP-compatible archive container.
//!
//! An [`Archive`] is an ordered index of entries keyed by path. It can be
//! opened over an existing byte buffer, read from, modified and serialized
//! back into a container that standard ZIP tools understand:
//!
//! - Stored (method 0) and DEFLATE (method 8) entries
//! - Single-disk archives with an optional trailing comment
//! - Lazy decompression straight from the source buffer
//! - Verbatim passthrough of untouched entries when rewriting
//! - Parallel reads with rayon (with `parallel` feature)
//!
//! ZIP64, encryption and multi-part archives are rejected.
//!
//! # Example
//!
//! ```
//! use packzip::{Archive, EntryKind};
//!
//! let mut archive = Archive::new();
//! archive.add("readme.txt", b"hello".as_slice());
//! archive.add("data/zeros.bin", vec![0u8; 4096]);
//! let bytes = archive.write()?;
//!
//! let reopened = Archive::open(&bytes)?;
//! assert_eq!(reopened.read("readme.txt")?, b"hello");
//!
//! let status = reopened.status("data/zeros.bin")?;
//! assert_eq!(status.kind, EntryKind::File);
//! assert!(status.size_in_archive < status.size);
//! # Ok::<(), packzip::Error>(())
//! ```

mod archive;
mod codec;
mod entry;
mod error;
mod options;
mod recognize;
mod writer;
pub mod zip;

pub use archive::Archive;
pub use entry::{EntryKind, EntryStatus};
pub use error::{Error, Result};
pub use options::{
    ArchiveOptions, DEFAULT_COMPRESSION_LEVEL, DEFAULT_DEFLATE_RATIO, DEFAULT_MAX_COMMENT_SIZE,
};
pub use recognize::{recognize, recognize_path, KNOWN_EXTENSIONS};
pub use zip::{CompressionMethod, DosDateTime};
