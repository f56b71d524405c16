use lz4s_frame::{LZ4_MAGIC, MAGIC_SIZE};

use crate::error::FormatError;

/// Check that `fill` starts with the LZ4 frame magic number.
///
/// Returns the number of bytes the caller must consume on success.
///
/// # Errors
///
/// - [`FormatError::ShortMagic`] if fewer than four bytes are available.
/// - [`FormatError::BadMagic`] if the little-endian word is not `0x184D2204`.
pub fn validate_magic(fill: &[u8]) -> Result<usize, FormatError> {
    let Some(bytes) = fill.first_chunk::<MAGIC_SIZE>() else {
        return Err(FormatError::ShortMagic {
            available: fill.len(),
        });
    };
    let found = u32::from_le_bytes(*bytes);
    if found != LZ4_MAGIC {
        return Err(FormatError::BadMagic { found });
    }
    Ok(MAGIC_SIZE)
}
