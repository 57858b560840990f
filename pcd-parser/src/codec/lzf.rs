//! LZF decompression for `binary_compressed` bodies, backed by the `lzf` crate.

use log::trace;

use crate::error::{PcdError, Result};

/// Largest output one input byte can account for. The densest LZF chunk is a
/// 3-byte back reference producing 264 bytes.
const LZF_MAX_RATIO: usize = 88;

/// Inflates `input` into a buffer of exactly `expected_size` bytes.
///
/// # Errors
/// Returns [`PcdError::DecompressionError`] if `expected_size` is more than `input`
/// could ever inflate to, if the stream is corrupt or inflates past `expected_size`,
/// or if it ends before producing `expected_size` bytes.
pub fn decompress(input: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    trace!(
        "Decompressing with LZF: {} bytes -> {} bytes (expected)",
        input.len(),
        expected_size
    );

    if expected_size > input.len().saturating_mul(LZF_MAX_RATIO) {
        return Err(PcdError::DecompressionError(format!(
            "declared size of {} bytes cannot come from a {} byte stream",
            expected_size,
            input.len()
        )));
    }
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let output = lzf::decompress(input, expected_size).map_err(|err| {
        PcdError::DecompressionError(format!("invalid LZF stream: {:?}", err))
    })?;

    if output.len() != expected_size {
        return Err(PcdError::DecompressionError(format!(
            "expected {} decompressed bytes, but produced {}",
            expected_size,
            output.len()
        )));
    }

    Ok(output)
}
