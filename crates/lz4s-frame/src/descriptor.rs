use std::fmt;

use xxhash_rust::xxh32::xxh32;

use crate::error::CodecError;

/// Magic number opening every LZ4 frame. Stored little-endian on the
/// wire, so the first four bytes of a stream are `04 22 4D 18`.
pub const LZ4_MAGIC: u32 = 0x184D_2204;

/// Magic number of the legacy LZ4 container.
pub const LEGACY_MAGIC: u32 = 0x184C_2102;

/// Lowest skippable-frame magic. The low nibble is free, so
/// `0x184D2A50..=0x184D2A5F` all mark skippable frames.
pub const SKIPPABLE_MAGIC_BASE: u32 = 0x184D_2A50;

const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFF_FFF0;

/// Size of any frame magic number in bytes.
pub const MAGIC_SIZE: usize = 4;

/// FLG + BD, the two descriptor bytes that are always present.
pub const DESCRIPTOR_PREFIX_SIZE: usize = 2;

/// Smallest descriptor: FLG + BD + header checksum.
pub const MIN_DESCRIPTOR_SIZE: usize = 3;

/// Largest descriptor: FLG + BD + content size + dictionary id + checksum.
pub const MAX_DESCRIPTOR_SIZE: usize = 15;

/// What a 4-byte value found at a frame boundary announces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MagicKind {
    Lz4,
    Skippable,
    Legacy,
    Unknown(u32),
}

impl MagicKind {
    /// Classify a little-endian magic value.
    #[must_use]
    pub fn of(value: u32) -> Self {
        if value == LZ4_MAGIC {
            Self::Lz4
        } else if value & SKIPPABLE_MAGIC_MASK == SKIPPABLE_MAGIC_BASE {
            Self::Skippable
        } else if value == LEGACY_MAGIC {
            Self::Legacy
        } else {
            Self::Unknown(value)
        }
    }
}

/// FLG descriptor byte.
///
/// Bit layout:
///   bits 7-6 = version (MUST be 01)
///   bit 5    = block independence
///   bit 4    = block checksums present
///   bit 3    = content size present
///   bit 2    = content checksum present
///   bit 1    = reserved (MUST be 0)
///   bit 0    = dictionary id present
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    pub const BLOCK_INDEPENDENCE: Self = Self(0b0010_0000);
    pub const BLOCK_CHECKSUM: Self = Self(0b0001_0000);
    pub const CONTENT_SIZE: Self = Self(0b0000_1000);
    pub const CONTENT_CHECKSUM: Self = Self(0b0000_0100);
    pub const DICT_ID: Self = Self(0b0000_0001);

    const RESERVED: u8 = 0b0000_0010;

    /// Supported value of the two version bits.
    pub const VERSION: u8 = 0b01;

    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn version(self) -> u8 {
        self.0 >> 6
    }

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    fn reserved_bits(self) -> u8 {
        self.0 & Self::RESERVED
    }
}

/// Maximum decoded size of one data block, from the BD byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockSize {
    Max64KB,
    Max256KB,
    Max1MB,
    Max4MB,
}

impl BlockSize {
    /// Map the 3-bit BD block-size id to a block maximum.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidBlockSize`] for ids outside `4..=7`.
    pub fn from_id(id: u8) -> Result<Self, CodecError> {
        match id {
            4 => Ok(Self::Max64KB),
            5 => Ok(Self::Max256KB),
            6 => Ok(Self::Max1MB),
            7 => Ok(Self::Max4MB),
            _ => Err(CodecError::InvalidBlockSize { id }),
        }
    }


    /// Block maximum in bytes.
    #[must_use]
    pub fn bytes(self) -> usize {
        match self {
            Self::Max64KB => 64 * 1024,
            Self::Max256KB => 256 * 1024,
            Self::Max1MB => 1024 * 1024,
            Self::Max4MB => 4 * 1024 * 1024,
        }
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max64KB => f.write_str("64KiB"),
            Self::Max256KB => f.write_str("256KiB"),
            Self::Max1MB => f.write_str("1MiB"),
            Self::Max4MB => f.write_str("4MiB"),
        }
    }
}

/// Whether blocks may refer back into earlier blocks of the same frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockMode {
    /// Matches may reach up to 64 KiB into previously decoded blocks.
    Linked,
    /// Every block decodes on its own.
    Independent,
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linked => f.write_str("linked"),
            Self::Independent => f.write_str("independent"),
        }
    }
}

/// Parsed LZ4 frame descriptor: everything between the magic number and
/// the first block header.
///
/// ```text
/// ┌─────┬────┬──────────────────┬──────────────────┬────┐
/// │ FLG │ BD │ content size (8) │ dictionary id (4)│ HC │
/// └─────┴────┴──────────────────┴──────────────────┴────┘
///              only if FLG bit 3   only if FLG bit 0
/// ```
///
/// `HC` is the second byte of `xxh32(FLG..dictionary id, seed 0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub block_size: BlockSize,
    pub block_mode: BlockMode,
    pub block_checksums: bool,
    pub content_checksum: bool,
    /// Decoded size of the whole frame, when the encoder recorded it.
    pub content_size: Option<u64>,
    /// Dictionary the encoder used, when it recorded one.
    pub dict_id: Option<u32>,
}

impl FrameInfo {
    /// Total descriptor length announced by a FLG byte, checksum included.
    #[must_use]
    pub fn descriptor_len(flg: u8) -> usize {
        let flags = FrameFlags::from_raw(flg);
        let mut len = MIN_DESCRIPTOR_SIZE;
        if flags.contains(FrameFlags::CONTENT_SIZE) {
            len += 8;
        }
        if flags.contains(FrameFlags::DICT_ID) {
            len += 4;
        }
        len
    }

    /// Parse a frame descriptor (the bytes right after the magic number).
    ///
    /// Validation order: length, version, reserved bits, block size,
    /// header checksum. Trailing bytes past the descriptor are ignored.
    ///
    /// # Errors
    ///
    /// - [`CodecError::IncompleteDescriptor`] if `buf` is shorter than the
    ///   descriptor its FLG byte announces.
    /// - [`CodecError::UnsupportedVersion`] if the version bits are not `01`.
    /// - [`CodecError::ReservedBitSet`] if a reserved FLG or BD bit is set.
    /// - [`CodecError::InvalidBlockSize`] if the BD block-size id is not 4..=7.
    /// - [`CodecError::HeaderChecksum`] if the HC byte does not match.
    pub fn read_from(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < DESCRIPTOR_PREFIX_SIZE {
            return Err(CodecError::IncompleteDescriptor {
                needed: MIN_DESCRIPTOR_SIZE,
                available: buf.len(),
            });
        }

        let flags = FrameFlags::from_raw(buf[0]);
        let bd = buf[1];
        let len = Self::descriptor_len(buf[0]);
        if buf.len() < len {
            return Err(CodecError::IncompleteDescriptor {
                needed: len,
                available: buf.len(),
            });
        }

        if flags.version() != FrameFlags::VERSION {
            return Err(CodecError::UnsupportedVersion {
                version: flags.version(),
            });
        }
        if flags.reserved_bits() != 0 {
            return Err(CodecError::ReservedBitSet {
                field: "FLG",
                value: buf[0],
            });
        }
        // BD: bit 7 and bits 3-0 are reserved.
        if bd & 0b1000_1111 != 0 {
            return Err(CodecError::ReservedBitSet {
                field: "BD",
                value: bd,
            });
        }
        let block_size = BlockSize::from_id((bd >> 4) & 0b111)?;

        let stored = buf[len - 1];
        let computed = header_checksum(&buf[..len - 1]);
        if stored != computed {
            return Err(CodecError::HeaderChecksum { stored, computed });
        }

        let mut cursor = DESCRIPTOR_PREFIX_SIZE;
        let content_size = if flags.contains(FrameFlags::CONTENT_SIZE) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[cursor..cursor + 8]);
            cursor += 8;
            Some(u64::from_le_bytes(raw))
        } else {
            None
        };
        let dict_id = if flags.contains(FrameFlags::DICT_ID) {
            let raw = [buf[cursor], buf[cursor + 1], buf[cursor + 2], buf[cursor + 3]];
            Some(u32::from_le_bytes(raw))
        } else {
            None
        };

        let block_mode = if flags.contains(FrameFlags::BLOCK_INDEPENDENCE) {
            BlockMode::Independent
        } else {
            BlockMode::Linked
        };

        Ok(Self {
            block_size,
            block_mode,
            block_checksums: flags.contains(FrameFlags::BLOCK_CHECKSUM),
            content_checksum: flags.contains(FrameFlags::CONTENT_CHECKSUM),
            content_size,
            dict_id,
        })
    }
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        write!(
            f,
            "block_size={} mode={} block_checksums={} content_checksum={}",
            self.block_size,
            self.block_mode,
            yes_no(self.block_checksums),
            yes_no(self.content_checksum),
        )?;
        match self.content_size {
            Some(size) => write!(f, " content_size={size}")?,
            None => f.write_str(" content_size=unknown")?,
        }
        match self.dict_id {
            Some(id) => write!(f, " dict_id={id:#010X}"),
            None => f.write_str(" dict_id=none"),
        }
    }
}

/// Header checksum byte over FLG..dictionary id.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn header_checksum(descriptor: &[u8]) -> u8 {
    ((xxh32(descriptor, 0) >> 8) & 0xFF) as u8
}
