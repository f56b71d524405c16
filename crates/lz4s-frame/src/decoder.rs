use xxhash_rust::xxh32::xxh32;

use crate::block::{BLOCK_HEADER_SIZE, BlockHeader, CHECKSUM_SIZE};
use crate::codec::{DecodeStep, FrameCodec};
use crate::descriptor::{
    DESCRIPTOR_PREFIX_SIZE, FrameInfo, MAGIC_SIZE, MAX_DESCRIPTOR_SIZE, MIN_DESCRIPTOR_SIZE,
    MagicKind,
};
use crate::error::CodecError;
use crate::window::{Window, try_alloc};

/// Knobs for [`FrameDecoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Verify block and content checksums when the frame carries them.
    pub verify_checksums: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// Where the engine is within the frame sequence.
///
/// ```text
///   Magic ─▶ Descriptor ─▶ BlockHeader ⇄ Block
///     ▲                        │
///     │                        ▼ (end mark)
///     ├──────────────── ContentChecksum
///     │
///     └── SkippableSize ─▶ Skip
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    /// On a frame boundary, waiting for the next magic number.
    Magic,
    Descriptor,
    BlockHeader,
    Block { size: usize, compressed: bool },
    ContentChecksum,
    SkippableSize,
    Skip { remaining: u64 },
}

/// Accumulates one fixed-size unit (magic, descriptor, block header, block
/// body, checksum) that may arrive split across several calls.
#[derive(Default)]
struct Staging {
    buf: Vec<u8>,
}

impl Staging {
    /// Copy from `src` until `need` bytes are staged. Returns bytes taken.
    fn stage(&mut self, src: &[u8], need: usize) -> usize {
        let take = need.saturating_sub(self.buf.len()).min(src.len());
        self.buf.extend_from_slice(&src[..take]);
        take
    }

    fn len(&self) -> usize {
        self.buf.len()
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn bytes(&self) -> &[u8] {
        &self.buf
    }

    fn word(&self) -> u32 {
        u32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
    }

    fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Incremental LZ4 frame decoder.
///
/// Accepts compressed input in slices of any size and writes decoded
/// output into destination slices of any size, keeping whatever does not
/// fit for the next call. Handles concatenated frames, skippable frames,
/// linked and independent blocks, and optional xxh32 checksums.
///
/// # Example
///
/// ```rust
/// use lz4s_frame::{FrameCodec, FrameDecoder, DecoderOptions};
///
/// // One stored block holding "hello", no checksums.
/// let frame = [
///     0x04, 0x22, 0x4D, 0x18, 0x60, 0x40, 0x82,
///     0x05, 0x00, 0x00, 0x80, b'h', b'e', b'l', b'l', b'o',
///     0x00, 0x00, 0x00, 0x00,
/// ];
/// let mut decoder = FrameDecoder::new(DecoderOptions::default()).unwrap();
/// let mut out = [0u8; 16];
/// let step = decoder.decode(&frame, &mut out).unwrap();
/// assert_eq!(&out[..step.produced], b"hello");
/// assert!(step.is_frame_complete());
/// ```
pub struct FrameDecoder {
    options: DecoderOptions,
    stage: Stage,
    staging: Staging,
    window: Window,
    info: Option<FrameInfo>,
    frames_completed: u64,
}

impl FrameDecoder {
    /// Create a decoder positioned before the first magic number.
    ///
    /// # Errors
    ///
    /// [`CodecError::Allocation`] if the history window cannot be allocated.
    pub fn new(options: DecoderOptions) -> Result<Self, CodecError> {
        let mut staging = Staging::default();
        try_alloc(&mut staging.buf, MAX_DESCRIPTOR_SIZE)?;
        Ok(Self {
            options,
            stage: Stage::Magic,
            staging,
            window: Window::new()?,
            info: None,
            frames_completed: 0,
        })
    }

    /// Compressed bytes still owed for the unit currently being staged.
    fn hint(&self) -> usize {
        let staged = self.staging.len();
        match self.stage {
            Stage::Magic if staged == 0 => 0,
            Stage::Magic | Stage::SkippableSize => MAGIC_SIZE - staged,
            Stage::Descriptor => {
                let total = if staged < DESCRIPTOR_PREFIX_SIZE {
                    MIN_DESCRIPTOR_SIZE
                } else {
                    FrameInfo::descriptor_len(self.staging.bytes()[0])
                };
                total.saturating_sub(staged) + BLOCK_HEADER_SIZE
            }
            Stage::BlockHeader => BLOCK_HEADER_SIZE - staged,
            Stage::Block { size, .. } => {
                self.block_unit(size).saturating_sub(staged) + BLOCK_HEADER_SIZE
            }
            Stage::ContentChecksum => CHECKSUM_SIZE - staged,
            Stage::Skip { remaining } => usize::try_from(remaining).unwrap_or(usize::MAX).max(1),
        }
    }

    /// Block body plus its checksum, if the frame carries block checksums.
    fn block_unit(&self, size: usize) -> usize {
        match self.info {
            Some(info) if info.block_checksums => size + CHECKSUM_SIZE,
            _ => size,
        }
    }

    fn step(&self, consumed: usize, produced: usize) -> DecodeStep {
        DecodeStep {
            consumed,
            produced,
            hint: self.hint(),
        }
    }

    /// Block maximum and end-of-frame checksum flag of the open frame.
    fn frame_limits(&self) -> (usize, bool) {
        self.info
            .map_or((0, false), |info| (info.block_size.bytes(), info.content_checksum))
    }

    fn open_frame(&mut self, info: FrameInfo) -> Result<(), CodecError> {
        self.window.start(&info, self.options.verify_checksums)?;
        try_alloc(&mut self.staging.buf, info.block_size.bytes() + CHECKSUM_SIZE)?;
        self.info = Some(info);
        self.stage = Stage::BlockHeader;
        Ok(())
    }

    fn close_frame(&mut self) -> Result<(), CodecError> {
        if let Some(FrameInfo {
            content_size: Some(declared),
            ..
        }) = self.info
        {
            let actual = self.window.content_len();
            if declared != actual {
                return Err(CodecError::ContentSizeMismatch { declared, actual });
            }
        }
        self.frames_completed += 1;
        self.stage = Stage::Magic;
        Ok(())
    }

    /// Shared state machine behind `decode` and `read_frame_info`.
    ///
    /// With `header_only` the loop stops right after a descriptor has
    /// been parsed.
    #[allow(clippy::too_many_lines)]
    fn run(
        &mut self,
        src: &[u8],
        dst: &mut [u8],
        header_only: bool,
    ) -> Result<DecodeStep, CodecError> {
        let mut consumed = 0;
        let mut produced = 0;

        loop {
            produced += self.window.flush_into(&mut dst[produced..]);
            if self.window.pending() > 0 {
                return Ok(self.step(consumed, produced));
            }

            let input = &src[consumed..];
            match self.stage {
                Stage::Magic => {
                    if input.is_empty() {
                        return Ok(self.step(consumed, produced));
                    }
                    consumed += self.staging.stage(input, MAGIC_SIZE);
                    if self.staging.len() < MAGIC_SIZE {
                        return Ok(self.step(consumed, produced));
                    }
                    let magic = self.staging.word();
                    self.staging.clear();
                    self.stage = match MagicKind::of(magic) {
                        MagicKind::Lz4 => Stage::Descriptor,
                        MagicKind::Skippable => Stage::SkippableSize,
                        MagicKind::Legacy => return Err(CodecError::LegacyFrame),
                        MagicKind::Unknown(found) => {
                            return Err(CodecError::UnknownMagic { found });
                        }
                    };
                }

                Stage::Descriptor => {
                    consumed += self.staging.stage(input, DESCRIPTOR_PREFIX_SIZE);
                    if self.staging.len() < DESCRIPTOR_PREFIX_SIZE {
                        return Ok(self.step(consumed, produced));
                    }
                    let len = FrameInfo::descriptor_len(self.staging.bytes()[0]);
                    consumed += self.staging.stage(&src[consumed..], len);
                    if self.staging.len() < len {
                        return Ok(self.step(consumed, produced));
                    }
                    let info = FrameInfo::read_from(self.staging.bytes())?;
                    self.staging.clear();
                    self.open_frame(info)?;
                    if header_only {
                        return Ok(self.step(consumed, produced));
                    }
                }

                Stage::BlockHeader => {
                    consumed += self.staging.stage(input, BLOCK_HEADER_SIZE);
                    if self.staging.len() < BLOCK_HEADER_SIZE {
                        return Ok(self.step(consumed, produced));
                    }
                    let (max, content_checksum) = self.frame_limits();
                    let header = BlockHeader::from_raw(self.staging.word()).check_size(max)?;
                    self.staging.clear();
                    match header {
                        BlockHeader::EndMark if content_checksum => {
                            self.stage = Stage::ContentChecksum;
                        }
                        BlockHeader::EndMark => {
                            self.close_frame()?;
                            return Ok(self.step(consumed, produced));
                        }
                        BlockHeader::Data { size, compressed } => {
                            self.stage = Stage::Block { size, compressed };
                        }
                    }
                }

                Stage::Block { size, compressed } => {
                    let need = self.block_unit(size);
                    // Whole unit available and nothing staged: decode straight
                    // from the caller's slice.
                    let unit: &[u8] = if self.staging.is_empty() && input.len() >= need {
                        consumed += need;
                        &input[..need]
                    } else {
                        consumed += self.staging.stage(input, need);
                        if self.staging.len() < need {
                            return Ok(self.step(consumed, produced));
                        }
                        self.staging.bytes()
                    };

                    let (body, trailer) = unit.split_at(size);
                    if self.options.verify_checksums && trailer.len() == CHECKSUM_SIZE {
                        let stored =
                            u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
                        let computed = xxh32(body, 0);
                        if stored != computed {
                            return Err(CodecError::BlockChecksum { stored, computed });
                        }
                    }
                    self.window.decode_block(body, compressed)?;
                    self.staging.clear();
                    self.stage = Stage::BlockHeader;
                }

                Stage::ContentChecksum => {
                    consumed += self.staging.stage(input, CHECKSUM_SIZE);
                    if self.staging.len() < CHECKSUM_SIZE {
                        return Ok(self.step(consumed, produced));
                    }
                    let stored = self.staging.word();
                    self.staging.clear();
                    if let Some(computed) = self.window.content_digest() {
                        if stored != computed {
                            return Err(CodecError::ContentChecksum { stored, computed });
                        }
                    }
                    self.close_frame()?;
                    return Ok(self.step(consumed, produced));
                }

                Stage::SkippableSize => {
                    consumed += self.staging.stage(input, MAGIC_SIZE);
                    if self.staging.len() < MAGIC_SIZE {
                        return Ok(self.step(consumed, produced));
                    }
                    let remaining = u64::from(self.staging.word());
                    self.staging.clear();
                    self.stage = Stage::Skip { remaining };
                }

                Stage::Skip { remaining } => {
                    if remaining == 0 {
                        self.frames_completed += 1;
                        self.stage = Stage::Magic;
                        return Ok(self.step(consumed, produced));
                    }
                    let take = usize::try_from(remaining)
                        .unwrap_or(usize::MAX)
                        .min(input.len());
                    if take == 0 {
                        return Ok(self.step(consumed, produced));
                    }
                    consumed += take;
                    self.stage = Stage::Skip {
                        remaining: remaining - take as u64,
                    };
                }
            }
        }
    }
}

impl FrameCodec for FrameDecoder {
    fn begin_frame(&mut self) {
        self.staging.clear();
        self.stage = Stage::Descriptor;
    }

    fn read_frame_info(&mut self, src: &[u8]) -> Result<(usize, Option<FrameInfo>), CodecError> {
        if !matches!(self.stage, Stage::Magic | Stage::Descriptor) {
            return Ok((0, self.info));
        }
        let step = self.run(src, &mut [], true)?;
        let info = match self.stage {
            Stage::Magic | Stage::Descriptor => None,
            _ => self.info,
        };
        Ok((step.consumed, info))
    }

    fn decode(&mut self, src: &[u8], dst: &mut [u8]) -> Result<DecodeStep, CodecError> {
        self.run(src, dst, false)
    }

    fn frame_info(&self) -> Option<&FrameInfo> {
        self.info.as_ref()
    }

    fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    fn finish(&self) -> Result<(), CodecError> {
        let needed = self.hint();
        if needed == 0 && self.window.pending() == 0 {
            Ok(())
        } else {
            Err(CodecError::Truncated {
                needed: needed.max(1),
            })
        }
    }

    fn release(&mut self) -> Result<(), CodecError> {
        let outcome = self.finish();
        self.window.free();
        self.staging = Staging::default();
        self.stage = Stage::Magic;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lz4_flex::frame::{BlockMode as FlexMode, BlockSize as FlexSize, FrameEncoder};

    use super::*;
    use crate::descriptor::{BlockMode, BlockSize};

    const HELLO_FRAME: [u8; 20] = [
        0x04, 0x22, 0x4D, 0x18, 0x60, 0x40, 0x82, 0x05, 0x00, 0x00, 0x80, b'h', b'e', b'l', b'l',
        b'o', 0x00, 0x00, 0x00, 0x00,
    ];

    /// "lz4 stream" as one literal-only block, with content size, block
    /// checksum and content checksum.
    const CHECKED_FRAME: [u8; 42] = [
        0x04, 0x22, 0x4D, 0x18, 0x7C, 0x40, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xDF,
        0x0B, 0x00, 0x00, 0x00, 0xA0, b'l', b'z', b'4', b' ', b's', b't', b'r', b'e', b'a', b'm',
        0x40, 0xCC, 0x1D, 0xAA, 0x00, 0x00, 0x00, 0x00, 0x7C, 0xC8, 0xFE, 0x20,
    ];

    fn decoder() -> FrameDecoder {
        FrameDecoder::new(DecoderOptions::default()).unwrap()
    }

    fn compress(data: &[u8], size: FlexSize, mode: FlexMode) -> Vec<u8> {
        let info = lz4_flex::frame::FrameInfo::new()
            .block_size(size)
            .block_mode(mode)
            .content_checksum(true)
            .block_checksums(true);
        let mut encoder = FrameEncoder::with_frame_info(info, Vec::new());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Feed `src` in `chunk`-byte slices, draining into `out_chunk`-byte
    /// destinations, and collect everything produced.
    fn drive(decoder: &mut FrameDecoder, src: &[u8], chunk: usize, out_chunk: usize) -> Vec<u8> {
        let mut output = Vec::new();
        let mut dst = vec![0u8; out_chunk];
        let mut pos = 0;
        loop {
            let end = (pos + chunk).min(src.len());
            let step = decoder.decode(&src[pos..end], &mut dst).unwrap();
            pos += step.consumed;
            output.extend_from_slice(&dst[..step.produced]);
            if !step.made_progress() && pos == src.len() {
                break;
            }
        }
        output
    }

    fn sample(len: usize) -> Vec<u8> {
        b"the quick brown fox jumps over the lazy dog "
            .iter()
            .cycle()
            .take(len)
            .copied()
            .collect()
    }

    #[test]
    fn decodes_stored_block_in_one_call() {
        let mut dec = decoder();
        let mut out = [0u8; 32];
        let step = dec.decode(&HELLO_FRAME, &mut out).unwrap();
        assert_eq!(step.consumed, HELLO_FRAME.len());
        assert_eq!(step.produced, 5);
        assert_eq!(step.hint, 0);
        assert_eq!(&out[..5], b"hello");
        assert_eq!(dec.frames_completed(), 1);
    }

    #[test]
    fn decodes_checked_frame() {
        let mut dec = decoder();
        let out = drive(&mut dec, &CHECKED_FRAME, CHECKED_FRAME.len(), 64);
        assert_eq!(out, b"lz4 stream");
        let info = dec.frame_info().unwrap();
        assert_eq!(info.content_size, Some(10));
        assert!(info.block_checksums);
        dec.finish().unwrap();
    }

    #[test]
    fn byte_at_a_time_input_and_output() {
        let mut dec = decoder();
        let out = drive(&mut dec, &CHECKED_FRAME, 1, 1);
        assert_eq!(out, b"lz4 stream");
    }

    #[test]
    fn begin_frame_skips_magic() {
        let mut dec = decoder();
        dec.begin_frame();
        let mut out = [0u8; 8];
        let step = dec.decode(&HELLO_FRAME[4..], &mut out).unwrap();
        assert_eq!(&out[..step.produced], b"hello");
        assert!(step.is_frame_complete());
    }

    #[test]
    fn read_frame_info_stops_after_descriptor() {
        let mut dec = decoder();
        dec.begin_frame();
        let (used, info) = dec.read_frame_info(&CHECKED_FRAME[4..]).unwrap();
        assert_eq!(used, 11);
        let info = info.unwrap();
        assert_eq!(info.block_size, BlockSize::Max64KB);
        assert_eq!(info.block_mode, BlockMode::Independent);

        // Already past the descriptor: nothing more is consumed.
        let (again, _) = dec.read_frame_info(&CHECKED_FRAME[15..]).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn read_frame_info_across_split_input() {
        let mut dec = decoder();
        dec.begin_frame();
        let (used, info) = dec.read_frame_info(&CHECKED_FRAME[4..9]).unwrap();
        assert_eq!(used, 5);
        assert!(info.is_none());
        let (used, info) = dec.read_frame_info(&CHECKED_FRAME[9..]).unwrap();
        assert_eq!(used, 6);
        assert_eq!(info.unwrap().content_size, Some(10));
    }

    #[test]
    fn hint_counts_missing_bytes() {
        let mut dec = decoder();
        let mut out = [0u8; 8];
        let step = dec.decode(&HELLO_FRAME[..2], &mut out).unwrap();
        assert_eq!(step.consumed, 2);
        assert_eq!(step.hint, 2);

        let step = dec.decode(&HELLO_FRAME[2..7], &mut out).unwrap();
        // descriptor done, next block header expected
        assert_eq!(step.hint, BLOCK_HEADER_SIZE);

        let step = dec.decode(&HELLO_FRAME[7..11], &mut out).unwrap();
        // 5-byte stored body + next header
        assert_eq!(step.hint, 5 + BLOCK_HEADER_SIZE);
    }

    #[test]
    fn idle_decoder_reports_boundary() {
        let mut dec = decoder();
        let step = dec.decode(&[], &mut [0u8; 4]).unwrap();
        assert_eq!(step, DecodeStep::default());
        dec.finish().unwrap();
    }

    #[test]
    fn pending_output_survives_full_destination() {
        let mut dec = decoder();
        let mut out = [0u8; 2];
        let step = dec.decode(&HELLO_FRAME, &mut out).unwrap();
        assert_eq!(step.produced, 2);
        assert!(step.hint > 0);
        assert!(dec.finish().is_err());

        let rest = &HELLO_FRAME[step.consumed..];
        let mut out = [0u8; 16];
        let step = dec.decode(rest, &mut out).unwrap();
        assert_eq!(&out[..step.produced], b"llo");
        assert!(step.is_frame_complete());
    }

    #[test]
    fn concatenated_and_skippable_frames() {
        let mut stream = HELLO_FRAME.to_vec();
        stream.extend_from_slice(&[0x50, 0x2A, 0x4D, 0x18, 0x04, 0x00, 0x00, 0x00]);
        stream.extend_from_slice(b"skip");
        stream.extend_from_slice(&CHECKED_FRAME);

        let mut dec = decoder();
        let out = drive(&mut dec, &stream, 3, 5);
        assert_eq!(out, b"hellolz4 stream");
        assert_eq!(dec.frames_completed(), 3);
    }

    #[test]
    fn roundtrip_linked_blocks() {
        let data = sample(300_000);
        let frame = compress(&data, FlexSize::Max64KB, FlexMode::Linked);
        let mut dec = decoder();
        assert_eq!(drive(&mut dec, &frame, 4096, 1000), data);
        assert_eq!(dec.frame_info().unwrap().block_mode, BlockMode::Linked);
    }

    #[test]
    fn roundtrip_independent_large_blocks() {
        let data = sample(1_500_000);
        let frame = compress(&data, FlexSize::Max1MB, FlexMode::Independent);
        let mut dec = decoder();
        assert_eq!(drive(&mut dec, &frame, 70_000, 65_536), data);
        assert_eq!(dec.frame_info().unwrap().block_size, BlockSize::Max1MB);
    }

    #[test]
    fn corrupt_block_checksum_detected() {
        let mut frame = CHECKED_FRAME;
        frame[30] ^= 0xFF;
        let mut dec = decoder();
        let result = dec.decode(&frame, &mut [0u8; 64]);
        assert!(matches!(result, Err(CodecError::BlockChecksum { .. })));
    }

    #[test]
    fn corrupt_content_checksum_detected() {
        let mut frame = CHECKED_FRAME;
        frame[41] ^= 0xFF;
        let mut dec = decoder();
        let result = dec.decode(&frame, &mut [0u8; 64]);
        assert!(matches!(result, Err(CodecError::ContentChecksum { .. })));
    }

    #[test]
    fn checksums_ignored_when_disabled() {
        let mut frame = CHECKED_FRAME;
        frame[30] ^= 0xFF;
        frame[41] ^= 0xFF;
        let mut dec = FrameDecoder::new(DecoderOptions {
            verify_checksums: false,
        })
        .unwrap();
        let mut out = [0u8; 64];
        let step = dec.decode(&frame, &mut out).unwrap();
        assert_eq!(&out[..step.produced], b"lz4 stream");
    }

    #[test]
    fn content_size_mismatch_detected() {
        // Same frame, content size claims 11 bytes (header checksum recomputed).
        let mut frame = CHECKED_FRAME;
        frame[6] = 11;
        frame[14] = crate::descriptor::header_checksum(&frame[4..14]);
        let mut dec = FrameDecoder::new(DecoderOptions {
            verify_checksums: false,
        })
        .unwrap();
        let result = dec.decode(&frame, &mut [0u8; 64]);
        assert!(matches!(
            result,
            Err(CodecError::ContentSizeMismatch { declared: 11, actual: 10 })
        ));
    }

    #[test]
    fn unknown_magic_between_frames() {
        let mut stream = HELLO_FRAME.to_vec();
        stream.extend_from_slice(b"junk");
        let mut dec = decoder();
        let mut out = [0u8; 16];
        let step = dec.decode(&stream, &mut out).unwrap();
        assert!(step.is_frame_complete());
        let result = dec.decode(&stream[step.consumed..], &mut out);
        assert!(matches!(result, Err(CodecError::UnknownMagic { found: 0x6B6E_756A })));
    }

    #[test]
    fn legacy_magic_rejected() {
        let mut dec = decoder();
        let result = dec.decode(&[0x02, 0x21, 0x4C, 0x18], &mut [0u8; 4]);
        assert!(matches!(result, Err(CodecError::LegacyFrame)));
    }

    #[test]
    fn finish_reports_truncation() {
        let mut dec = decoder();
        let mut out = [0u8; 16];
        dec.decode(&HELLO_FRAME[..13], &mut out).unwrap();
        assert!(matches!(dec.finish(), Err(CodecError::Truncated { needed: 7 })));
    }

    #[test]
    fn release_mid_frame_reports_but_frees() {
        let mut dec = decoder();
        dec.decode(&HELLO_FRAME[..9], &mut [0u8; 16]).unwrap();
        assert!(dec.release().is_err());
        // Released decoder is back on a boundary.
        dec.finish().unwrap();
    }

    #[test]
    fn oversized_block_rejected() {
        // Block header claims 0x10001 bytes in a 64 KiB frame.
        let frame = [
            0x04, 0x22, 0x4D, 0x18, 0x60, 0x40, 0x82, 0x01, 0x00, 0x01, 0x00,
        ];
        let mut dec = decoder();
        let result = dec.decode(&frame, &mut [0u8; 16]);
        assert!(matches!(result, Err(CodecError::BlockTooLarge { size: 65_537, .. })));
    }
}
