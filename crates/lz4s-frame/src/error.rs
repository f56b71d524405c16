/// Errors raised by the LZ4 frame engine.
///
/// Every variant is terminal for the frame being decoded: the engine does
/// not resynchronise after corrupt input. Variants carry the offending
/// values so a caller can report exactly what was wrong with the stream.
///
/// ```text
///   CodecError
///   ├── UnknownMagic          ← 4 bytes at a frame boundary are not a known magic
///   ├── LegacyFrame           ← legacy LZ4 container (0x184C2102)
///   ├── UnsupportedVersion    ← FLG version bits are not 01
///   ├── ReservedBitSet        ← reserved FLG/BD bit is non-zero
///   ├── InvalidBlockSize      ← BD block-size id outside 4..=7
///   ├── IncompleteDescriptor  ← descriptor parsed from too few bytes
///   ├── HeaderChecksum        ← descriptor checksum byte mismatch
///   ├── BlockTooLarge         ← block exceeds the frame's block maximum
///   ├── BlockChecksum         ← xxh32 of block data mismatch
///   ├── ContentChecksum       ← xxh32 of frame content mismatch
///   ├── ContentSizeMismatch   ← declared content size differs from output
///   ├── CorruptBlock          ← LZ4 block decompression failed
///   ├── Truncated             ← input ended inside a frame
///   └── Allocation            ← decoder buffers could not be allocated
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unknown frame magic number {found:#010X}")]
    UnknownMagic { found: u32 },

    #[error("legacy LZ4 frames are not supported")]
    LegacyFrame,

    #[error("unsupported frame version {version} (expected 1)")]
    UnsupportedVersion { version: u8 },

    /// A bit the format reserves for future use was set.
    ///
    /// `field` names the descriptor byte (`"FLG"` or `"BD"`) and `value`
    /// is the whole byte as read.
    #[error("reserved bit set in {field} byte {value:#04X}")]
    ReservedBitSet { field: &'static str, value: u8 },

    #[error("invalid block size id {id} (expected 4..=7)")]
    InvalidBlockSize { id: u8 },

    #[error("frame descriptor needs {needed} bytes, only {available} available")]
    IncompleteDescriptor { needed: usize, available: usize },

    #[error("header checksum mismatch: stored {stored:#04X}, computed {computed:#04X}")]
    HeaderChecksum { stored: u8, computed: u8 },

    #[error("block of {size} bytes exceeds frame block maximum of {max} bytes")]
    BlockTooLarge { size: usize, max: usize },

    #[error("block checksum mismatch: stored {stored:#010X}, computed {computed:#010X}")]
    BlockChecksum { stored: u32, computed: u32 },

    #[error("content checksum mismatch: stored {stored:#010X}, computed {computed:#010X}")]
    ContentChecksum { stored: u32, computed: u32 },

    #[error("frame declared {declared} content bytes but decoded {actual}")]
    ContentSizeMismatch { declared: u64, actual: u64 },

    /// The LZ4 block decoder rejected a block body.
    ///
    /// Carries the block decoder's own message. Common causes: a match
    /// offset pointing before the start of the available history, or a
    /// block that expands past the frame's block maximum.
    #[error("corrupt block: {0}")]
    CorruptBlock(String),

    /// Input ended while the engine still expected more bytes of the
    /// current frame.
    #[error("input ended inside a frame ({needed} more bytes expected)")]
    Truncated { needed: usize },

    #[error("cannot allocate {requested} bytes of decoder state")]
    Allocation { requested: usize },
}
