//! LZ4 block decompression.
//!
//! NSO segments use the raw LZ4 *block* format with no size prefix and no
//! frame; the expected output size comes from the segment header instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Lz4Error {
    #[error("lz4 block is malformed: {0}")]
    Malformed(#[from] lz4_flex::block::DecompressError),

    #[error("lz4 block decompressed to {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Decompress one LZ4 block into exactly `expected_size` bytes.
///
/// Producing more or fewer bytes than `expected_size` is an error.
pub fn decompress_block(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>, Lz4Error> {
    let out = lz4_flex::block::decompress(compressed, expected_size)?;
    if out.len() != expected_size {
        return Err(Lz4Error::SizeMismatch {
            expected: expected_size,
            actual: out.len(),
        });
    }
    Ok(out)
}
