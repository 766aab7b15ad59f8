//! Raw DEFLATE compression and decompression.
//!
//! ZIP entries carry bare deflate streams without zlib headers. Both
//! directions run in a single shot over buffers sized up front.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::{Error, Result};

/// Compress `data` into at most `budget` bytes.
///
/// Returns `Ok(None)` when the stream does not fit in the budget, meaning
/// compression is not worthwhile and the data should be stored.
pub fn compress(data: &[u8], level: u32, budget: usize) -> Result<Option<Vec<u8>>> {
    let mut compressor = Compress::new(Compression::new(level), false);
    let mut output = Vec::with_capacity(budget);

    let status = compressor
        .compress_vec(data, &mut output, FlushCompress::Finish)
        .map_err(|e| Error::Deflate(e.to_string()))?;

    if status == Status::StreamEnd && output.len() <= budget {
        Ok(Some(output))
    } else {
        Ok(None)
    }
}

/// Upper bound on how far a deflate stream can expand.
const MAX_DEFLATE_RATIO: usize = 1032;

/// Decompress `data`, which must inflate to exactly `expected_size` bytes.
pub fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decompressor = Decompress::new(false);
    let mut output = Vec::with_capacity(output_capacity(data.len(), expected_size));

    let status = decompressor
        .decompress_vec(data, &mut output, FlushDecompress::Finish)
        .map_err(|e| Error::Inflate(format!("corrupt data in archive: {e}")))?;

    if output.len() != expected_size {
        return Err(Error::Inflate(format!(
            "expected {} bytes, inflated {} ({:?})",
            expected_size,
            output.len(),
            status
        )));
    }

    Ok(output)
}

/// Output buffer size for inflating `compressed_len` bytes.
///
/// The declared size is trusted only as far as deflate can expand its
/// input. One spare byte lets over-long streams show up as a length
/// mismatch instead of being cut off.
fn output_capacity(compressed_len: usize, expected_size: usize) -> usize {
    expected_size
        .min(compressed_len.saturating_mul(MAX_DEFLATE_RATIO))
        .saturating_add(1)
}
