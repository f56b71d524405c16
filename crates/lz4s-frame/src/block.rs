use crate::error::CodecError;

/// Size of a block header (and of the end mark) in bytes.
pub const BLOCK_HEADER_SIZE: usize = 4;

/// Size of an xxh32 block or content checksum in bytes.
pub const CHECKSUM_SIZE: usize = 4;

/// High bit of a block header: the block body is stored, not compressed.
const UNCOMPRESSED_FLAG: u32 = 0x8000_0000;

/// A decoded 4-byte block header.
///
/// ```text
///   bit 31     = body stored uncompressed
///   bits 30-0  = body size in bytes
///   all zero   = end mark (no body, no checksum)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockHeader {
    /// Terminates the data blocks of a frame.
    EndMark,
    Data { size: usize, compressed: bool },
}

impl BlockHeader {
    /// Interpret a little-endian block header word.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            return Self::EndMark;
        }
        Self::Data {
            size: (raw & !UNCOMPRESSED_FLAG) as usize,
            compressed: raw & UNCOMPRESSED_FLAG == 0,
        }
    }

    /// Check the block body against the frame's block maximum.
    ///
    /// # Errors
    ///
    /// [`CodecError::BlockTooLarge`] if the body is larger than `max`.
    pub fn check_size(self, max: usize) -> Result<Self, CodecError> {
        match self {
            Self::Data { size, .. } if size > max => Err(CodecError::BlockTooLarge { size, max }),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_end_mark() {
        assert_eq!(BlockHeader::from_raw(0), BlockHeader::EndMark);
    }

    #[test]
    fn high_bit_marks_stored_block() {
        assert_eq!(
            BlockHeader::from_raw(0x8000_0005),
            BlockHeader::Data { size: 5, compressed: false }
        );
        assert_eq!(
            BlockHeader::from_raw(0x0000_0400),
            BlockHeader::Data { size: 1024, compressed: true }
        );
    }

    #[test]
    fn stored_block_of_zero_bytes_is_not_end_mark() {
        assert_eq!(
            BlockHeader::from_raw(0x8000_0000),
            BlockHeader::Data { size: 0, compressed: false }
        );
    }

    #[test]
    fn oversized_block_rejected() {
        let header = BlockHeader::Data { size: 65_537, compressed: true };
        assert!(matches!(
            header.check_size(65_536),
            Err(CodecError::BlockTooLarge { size: 65_537, max: 65_536 })
        ));
        assert!(BlockHeader::EndMark.check_size(0).is_ok());
    }
}
