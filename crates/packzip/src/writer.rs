//! Archive serialization.
//!
//! Writing emits one local header and payload per entry in index order,
//! then the central directory, the end record and an empty digital
//! signature record. Entries still backed by the source are copied verbatim
//! with their original compression; entries owning bytes are deflated when
//! that is worthwhile and stored otherwise.

use std::borrow::Cow;
use std::io::Write;

use packzip_common::BinaryWriter;
use tracing::{debug, trace, warn};
use zerocopy::little_endian::{U16, U32};

use crate::archive::Archive;
use crate::codec;
use crate::entry::{Backing, Entry};
use crate::zip::{
    CentralDirectoryHeader, CompressionMethod, DigitalSignature, EocdRecord, LocalFileHeader,
    VERSION_MADE_BY, VERSION_NEEDED,
};
use crate::{Error, Result};

impl Archive<'_> {
    /// Serialize the archive into a new buffer.
    pub fn write(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.write_to(&mut output)?;
        Ok(output)
    }

    /// Serialize the archive onto `sink`, returning the number of bytes
    /// written.
    ///
    /// Paths, sizes and contents are never changed. The compression chosen
    /// for in-memory entries and the new local header offsets are recorded
    /// in the index, so a following write reproduces the same layout.
    pub fn write_to<W: Write>(&mut self, sink: W) -> Result<u64> {
        let entry_count = u16::try_from(self.index.len())
            .map_err(|_| Error::CapacityExceeded("more than 65535 entries"))?;

        let source = self.source;
        let options = self.options;
        let mut writer = BinaryWriter::new(sink);
        let mut central_headers = Vec::with_capacity(self.index.len());

        for (path, entry) in self.index.iter_mut() {
            let local_header_offset = writer.position();

            let payload: Cow<'_, [u8]> = match &entry.backing {
                Backing::Source { offset } => {
                    let stored = source
                        .and_then(|source| source.get(*offset..))
                        .and_then(|rest| rest.get(..entry.size_in_archive as usize))
                        .ok_or_else(|| Error::EntryOutOfBounds { path: path.clone() })?;
                    Cow::Borrowed(stored)
                }
                Backing::Owned(data) => {
                    let budget = options.deflate_budget(data.len());
                    match codec::compress(data, options.compression_level, budget) {
                        Ok(Some(compressed)) => {
                            entry.compression = CompressionMethod::Deflate;
                            entry.size_in_archive = compressed.len() as u64;
                            Cow::Owned(compressed)
                        }
                        Ok(None) => {
                            entry.compression = CompressionMethod::Store;
                            entry.size_in_archive = entry.size;
                            Cow::Borrowed(data.as_slice())
                        }
                        Err(e) => {
                            warn!(path = %path, error = %e, "deflate failed, storing uncompressed");
                            entry.compression = CompressionMethod::Store;
                            entry.size_in_archive = entry.size;
                            Cow::Borrowed(data.as_slice())
                        }
                    }
                }
            };

            let header = local_header(path, entry)?;
            header.write_to(&mut writer)?;
            writer.write_bytes(entry.name_bytes(path))?;
            writer.write_bytes(&payload)?;

            trace!(
                path = %path,
                offset = local_header_offset,
                compression = ?entry.compression,
                stored = payload.len(),
                "entry written"
            );

            let offset = to_u32(local_header_offset, "archive larger than 4 GiB")?;
            let central = CentralDirectoryHeader::for_local(&header, VERSION_MADE_BY, offset);
            central_headers.push(central);
            entry.local_header_offset = local_header_offset;
        }

        let central_dir_offset = writer.position();
        for (header, (path, entry)) in central_headers.iter().zip(&self.index) {
            header.write_to(&mut writer)?;
            writer.write_bytes(entry.name_bytes(path))?;
        }
        let central_dir_size = writer.position() - central_dir_offset;

        EocdRecord::single_disk(
            entry_count,
            to_u32(central_dir_size, "central directory larger than 4 GiB")?,
            to_u32(central_dir_offset, "archive larger than 4 GiB")?,
        )
        .write_to(&mut writer)?;

        // Empty signature record for readers that look for one.
        DigitalSignature::default().write_to(&mut writer)?;
        writer.flush()?;

        debug!(
            entries = entry_count,
            central_dir_offset,
            bytes = writer.position(),
            "archive written"
        );

        Ok(writer.position())
    }
}

fn local_header(path: &str, entry: &Entry) -> Result<LocalFileHeader> {
    let (date, time) = entry.modified.packed();
    let name_length = u16::try_from(entry.name_bytes(path).len())
        .map_err(|_| Error::CapacityExceeded("entry name longer than 65535 bytes"))?;

    Ok(LocalFileHeader {
        version_needed: U16::new(VERSION_NEEDED),
        flags: U16::new(entry.header_flags(path)),
        compression_method: U16::new(entry.compression.code()),
        last_mod_time: U16::new(time),
        last_mod_date: U16::new(date),
        crc32: U32::new(entry.crc32),
        compressed_size: U32::new(to_u32(entry.size_in_archive, "entry larger than 4 GiB")?),
        uncompressed_size: U32::new(to_u32(entry.size, "entry larger than 4 GiB")?),
        file_name_length: U16::new(name_length),
        extra_field_length: U16::ZERO,
    })
}

#[inline]
fn to_u32(value: u64, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::CapacityExceeded(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryKind;
    use crate::options::ArchiveOptions;
    use crate::zip::{flags, DosDate, DosDateTime, DosTime};

    fn fixed_time() -> DosDateTime {
        DosDateTime::new(DosDate::new(2012, 12, 21), DosTime::new(11, 11, 10))
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x9E37_79B9u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    #[test]
    fn test_concrete_scenario() {
        let mut archive = Archive::new();
        archive.add("a.txt", b"hello".as_slice());
        archive.add("b.bin", vec![0u8; 10_000]);
        let first = archive.write().unwrap();

        let mut reopened = Archive::open(&first).unwrap();
        assert_eq!(reopened.read("a.txt").unwrap(), b"hello");
        assert_eq!(reopened.read("b.bin").unwrap().len(), 10_000);
        assert_eq!(reopened.status("a.txt").unwrap().size, 5);

        reopened.remove("a.txt").unwrap();
        let second = reopened.write().unwrap();

        let again = Archive::open(&second).unwrap();
        assert!(matches!(again.read("a.txt"), Err(Error::NotFound(_))));
        assert_eq!(again.read("b.bin").unwrap(), vec![0u8; 10_000]);
    }

    #[test]
    fn test_round_trip_many_entries() {
        let inputs: Vec<(String, Vec<u8>)> = vec![
            ("empty".into(), Vec::new()),
            ("one".into(), vec![42]),
            ("text/lines.txt".into(), b"line\n".repeat(500)),
            ("noise.bin".into(), noise(3000)),
            ("deep/a/b/c.dat".into(), (0..=255u8).collect()),
        ];

        let mut archive = Archive::new();
        for (path, data) in &inputs {
            archive.add(path.as_str(), data.as_slice());
        }
        let bytes = archive.write().unwrap();

        let reopened = Archive::open(&bytes).unwrap();
        assert_eq!(reopened.len(), inputs.len());
        for (path, data) in &inputs {
            assert_eq!(&reopened.read(path).unwrap(), data, "{path}");
            assert_eq!(reopened.status(path).unwrap().size, data.len() as u64);
        }
        assert_eq!(
            reopened.paths().collect::<Vec<_>>(),
            inputs.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_compression_decision() {
        let mut archive = Archive::new();
        archive.add("text", b"abcdefgh".repeat(1000));
        archive.add("noise", noise(4096));
        archive.add("empty", Vec::new());
        let bytes = archive.write().unwrap();

        let text = archive.status("text").unwrap();
        assert_eq!(text.compression, CompressionMethod::Deflate);
        assert!(text.size_in_archive <= (text.size as f64 * 0.98) as u64);

        let noisy = archive.status("noise").unwrap();
        assert_eq!(noisy.compression, CompressionMethod::Store);
        assert_eq!(noisy.size_in_archive, noisy.size);

        assert_eq!(archive.status("empty").unwrap().compression, CompressionMethod::Store);

        let reopened = Archive::open(&bytes).unwrap();
        assert_eq!(reopened.status("text").unwrap().compression, CompressionMethod::Deflate);
        assert_eq!(reopened.status("noise").unwrap().compression, CompressionMethod::Store);
    }

    #[test]
    fn test_deflate_ratio_option() {
        let options = ArchiveOptions::default().with_deflate_ratio(0.0);
        let mut archive = Archive::with_options(options);
        archive.add("text", b"abcdefgh".repeat(1000));
        archive.write().unwrap();

        assert_eq!(archive.status("text").unwrap().compression, CompressionMethod::Store);
    }

    #[test]
    fn test_idempotent_rewrite_of_opened_archive() {
        let mut archive = Archive::new();
        archive.add_with_modified("x.txt", b"xyz".repeat(300), fixed_time());
        archive.add_with_modified("y.bin", noise(512), fixed_time());
        let original = archive.write().unwrap();

        let mut opened = Archive::open(&original).unwrap();
        let first = opened.write().unwrap();
        let second = opened.write().unwrap();
        assert_eq!(first, second);
        // Our own output has no extra fields, so passthrough reproduces it.
        assert_eq!(first, original);
    }

    #[test]
    fn test_idempotent_rewrite_of_memory_archive() {
        let mut archive = Archive::new();
        archive.add("a", b"aaaa".repeat(64));
        archive.add("b", noise(100));

        let first = archive.write().unwrap();
        let second = archive.write().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_passthrough_preserves_compressed_bytes() {
        use std::io::{Cursor, Write as _};
        use ::zip::write::SimpleFileOptions;

        let text = b"passthrough keeps the stored stream ".repeat(50);
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        let best = SimpleFileOptions::default()
            .compression_method(::zip::CompressionMethod::Deflated)
            .compression_level(Some(9));
        writer.start_file("kept.txt", best).unwrap();
        writer.write_all(&text).unwrap();
        writer.start_file("touched.txt", best).unwrap();
        writer.write_all(&text).unwrap();
        let source = writer.finish().unwrap().into_inner();

        let mut archive = Archive::open(&source).unwrap();
        let kept_raw = archive.raw("kept.txt").unwrap().unwrap().to_vec();
        archive.load("touched.txt").unwrap();
        let rewritten = archive.write().unwrap();

        let reopened = Archive::open(&rewritten).unwrap();
        let kept = reopened.status("kept.txt").unwrap();
        assert_eq!(kept.compression, CompressionMethod::Deflate);
        assert_eq!(reopened.raw("kept.txt").unwrap().unwrap(), kept_raw.as_slice());
        assert_eq!(reopened.read("kept.txt").unwrap(), text);

        // Loaded entries are recompressed but keep their content.
        assert_eq!(reopened.read("touched.txt").unwrap(), text);
        assert_eq!(
            reopened.status("touched.txt").unwrap().crc32,
            packzip_common::crc::hash_bytes(&text)
        );
    }

    #[test]
    fn test_written_layout() {
        let mut archive = Archive::new();
        archive.add_with_modified("n", b"z".as_slice(), fixed_time());
        let bytes = archive.write().unwrap();

        // local header + name + payload, central header + name, end record,
        // digital signature.
        assert_eq!(bytes.len(), (30 + 1 + 1) + (46 + 1) + 22 + 6);
        assert_eq!(&bytes[..4], &LocalFileHeader::MAGIC);
        assert_eq!(&bytes[32..36], &CentralDirectoryHeader::MAGIC);
        assert_eq!(&bytes[79..83], &EocdRecord::MAGIC);
        assert_eq!(&bytes[bytes.len() - 6..], b"PK\x05\x05\x00\x00");

        let status = Archive::open(&bytes).unwrap().status("n").unwrap();
        assert_eq!(status.modified, fixed_time());
        assert_eq!(status.kind, EntryKind::File);
    }

    #[test]
    fn test_write_to_reports_length() {
        let mut archive = Archive::new();
        archive.add("a", b"1".as_slice());

        archive.add("b", b"2".as_slice());

        let mut sink = Vec::new();
        let written = archive.write_to(&mut sink).unwrap();
        assert_eq!(written, sink.len() as u64);

        // Local headers of the last write: 30 bytes + name + payload each.
        assert_eq!(archive.status("a").unwrap().header_offset, 0);
        assert_eq!(archive.status("b").unwrap().header_offset, 32);
    }

    #[test]
    fn test_empty_archive() {
        let bytes = Archive::new().write().unwrap();
        assert_eq!(bytes.len(), 22 + 6);
        assert!(Archive::open(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_folder_placeholders_are_dropped_on_reopen() {
        let mut archive = Archive::new();
        archive.add("music/", Vec::new());
        archive.add("music/theme.mus", b"notes".as_slice());
        let bytes = archive.write().unwrap();

        let reopened = Archive::open(&bytes).unwrap();
        assert_eq!(reopened.paths().collect::<Vec<_>>(), ["music/theme.mus"]);
    }

    #[test]
    fn test_too_many_entries() {
        let mut archive = Archive::new();
        for i in 0..=u16::MAX as u32 {
            archive.add(i.to_string(), Vec::new());
        }

        assert!(matches!(archive.write(), Err(Error::CapacityExceeded(_))));
    }

    fn names_seen_by_zip_crate(bytes: &[u8]) -> Vec<String> {
        let mut reader = ::zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        (0..reader.len())
            .map(|i| reader.by_index(i).unwrap().name().to_owned())
            .collect()
    }

    fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
        haystack
            .windows(needle.len())
            .enumerate()
            .filter(|(_, window)| *window == needle)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_utf8_names_survive_rewrite() {
        use std::io::{Cursor, Write as _};
        use ::zip::write::SimpleFileOptions;

        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("caf\u{e9}.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"au lait").unwrap();
        writer.start_file("plain.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"ascii").unwrap();
        let source = writer.finish().unwrap().into_inner();

        let mut archive = Archive::open(&source).unwrap();
        let passthrough = archive.write().unwrap();
        assert_eq!(names_seen_by_zip_crate(&passthrough), ["caf\u{e9}.txt", "plain.txt"]);

        // Recompressed entries set the UTF-8 bit themselves.
        archive.load("caf\u{e9}.txt").unwrap();
        let recompressed = archive.write().unwrap();
        assert_eq!(names_seen_by_zip_crate(&recompressed), ["caf\u{e9}.txt", "plain.txt"]);
        assert_eq!(
            Archive::open(&recompressed).unwrap().read("caf\u{e9}.txt").unwrap(),
            b"au lait"
        );
    }

    #[test]
    fn test_added_non_ascii_name_is_flagged_utf8() {
        use std::io::Read as _;

        let mut archive = Archive::new();
        archive.add("na\u{ef}ve/r\u{e9}sum\u{e9}.md", b"# cv".as_slice());
        archive.add("ascii.md", b"plain".as_slice());
        let bytes = archive.write().unwrap();

        assert_eq!(
            names_seen_by_zip_crate(&bytes),
            ["na\u{ef}ve/r\u{e9}sum\u{e9}.md", "ascii.md"]
        );
        // Flags sit after the signature and the version field.
        let first_flags = u16::from_le_bytes([bytes[6], bytes[7]]);
        assert_eq!(first_flags, flags::UTF8);
        let status = archive.status("ascii.md").unwrap();
        let second = status.header_offset as usize;
        assert_eq!(u16::from_le_bytes([bytes[second + 6], bytes[second + 7]]), 0);

        let mut reader = ::zip::ZipArchive::new(std::io::Cursor::new(&bytes[..])).unwrap();
        let mut contents = String::new();
        reader
            .by_name("na\u{ef}ve/r\u{e9}sum\u{e9}.md")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "# cv");
    }

    #[test]
    fn test_undecodable_name_bytes_survive_rewrite() {
        let mut archive = Archive::new();
        archive.add_with_modified("cafX.txt", b"bytes".as_slice(), fixed_time());
        let mut source = archive.write().unwrap();

        // CP437 e-acute in both the local and the central copy of the name.
        let positions = find_all(&source, b"cafX.txt");
        assert_eq!(positions.len(), 2);
        for pos in positions {
            source[pos + 3] = 0x82;
        }

        let mut opened = Archive::open(&source).unwrap();
        let name = "caf\u{fffd}.txt";
        assert_eq!(opened.read(name).unwrap(), b"bytes");
        assert_eq!(opened.write().unwrap(), source);

        opened.load(name).unwrap();
        let reloaded = opened.write().unwrap();
        assert_eq!(find_all(&reloaded, b"caf\x82.txt").len(), 2);
        assert!(find_all(&reloaded, "caf\u{fffd}".as_bytes()).is_empty());
    }
}
