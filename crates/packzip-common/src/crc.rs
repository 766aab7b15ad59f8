//! CRC-32 checksum utilities.
//!
//! ZIP containers use the IEEE 802.3 polynomial (the same CRC as zlib and
//! gzip), not the Castagnoli variant.

/// Compute the CRC-32 of a byte slice.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hash() {
        assert_eq!(hash_bytes(&[]), 0);
    }

    #[test]
    fn test_check_value() {
        // Standard CRC-32 check value.
        assert_eq!(hash_bytes(b"123456789"), 0xCBF4_3926);
    }
}
