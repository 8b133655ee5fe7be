//! Compression utilities
//!
//! Entry payloads are raw LZ4 blocks (no frame, no size prefix). The
//! decompressed length always comes from the surrounding block header.

use crate::error::{Error, Result};

/// Compress data into a raw LZ4 block
///
/// # Errors
/// Returns an error if compression fails.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    Ok(lz4_flex::block::compress(data))
}

/// Decompress a raw LZ4 block that must expand to exactly `expected_size` bytes
///
/// # Errors
/// Returns [`Error::DecompressionFailed`] if the stream is malformed or the
/// output length differs from `expected_size`.
pub fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let decompressed = lz4_flex::block::decompress(data, expected_size)
        .map_err(|e| Error::DecompressionFailed { message: e.to_string() })?;

    if decompressed.len() != expected_size {
        return Err(Error::DecompressionFailed {
            message: format!(
                "expected {expected_size} bytes, got {}",
                decompressed.len()
            ),
        });
    }

    Ok(decompressed)
}
