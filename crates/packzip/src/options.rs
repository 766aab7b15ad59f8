//! Archive configuration.

/// Maximum tolerated size of the archive comment.
pub const DEFAULT_MAX_COMMENT_SIZE: usize = 2048;

/// Deflated output larger than this fraction of the input is stored instead.
pub const DEFAULT_DEFLATE_RATIO: f32 = 0.98;

/// zlib's default compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Options controlling how archives are scanned, read and written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchiveOptions {
    /// Size of the backward window searched for the end record. Archives
    /// whose comment is at least this long are not recognized.
    pub max_comment_size: usize,
    /// Compressed payloads must fit in `floor(deflate_ratio * size)` bytes.
    pub deflate_ratio: f32,
    /// Deflate level, 0-9.
    pub compression_level: u32,
    /// Re-check the CRC-32 of every decompressed entry on read.
    pub verify_crc: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            max_comment_size: DEFAULT_MAX_COMMENT_SIZE,
            deflate_ratio: DEFAULT_DEFLATE_RATIO,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            verify_crc: false,
        }
    }
}

impl ArchiveOptions {
    /// Set the end record scan window.
    pub fn with_max_comment_size(mut self, size: usize) -> Self {
        self.max_comment_size = size;
        self
    }

    /// Set the worthwhile-compression ratio.
    pub fn with_deflate_ratio(mut self, ratio: f32) -> Self {
        self.deflate_ratio = ratio;
        self
    }

    /// Set the deflate level (clamped to 9).
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Enable or disable CRC verification on read.
    pub fn with_verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Output budget for compressing `size` bytes.
    pub(crate) fn deflate_budget(&self, size: usize) -> usize {
        (self.deflate_ratio as f64 * size as f64) as usize
    }
}
