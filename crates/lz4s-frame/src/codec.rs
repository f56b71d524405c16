use crate::descriptor::FrameInfo;
use crate::error::CodecError;

/// Outcome of one [`FrameCodec::decode`] call.
///
/// `consumed` bytes were taken from the front of the source slice and
/// `produced` bytes were written to the front of the destination slice.
/// `hint` is `0` when the current frame has been fully decoded, and
/// otherwise an advisory count of compressed bytes still needed before
/// the engine can make further progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStep {
    pub consumed: usize,
    pub produced: usize,
    pub hint: usize,
}

impl DecodeStep {
    /// The engine sits on a frame boundary.
    #[must_use]
    pub fn is_frame_complete(&self) -> bool {
        self.hint == 0
    }

    #[must_use]
    pub fn made_progress(&self) -> bool {
        self.consumed > 0 || self.produced > 0
    }
}

/// A frame-decompression engine driven by a buffered reader.
///
/// The reader owns all I/O. The engine only ever sees slices: it never
/// re-reads bytes it reported as consumed, and it keeps any partially
/// received header or block in its own state, so the caller may split
/// the compressed input at arbitrary byte boundaries.
///
/// ```text
///   create ─▶ begin_frame ─▶ read_frame_info ─▶ decode … decode ─▶ finish ─▶ release
/// ```
pub trait FrameCodec {
    /// Mark that the caller has consumed and verified the magic number of
    /// the first frame. Decoding resumes at the frame descriptor.
    fn begin_frame(&mut self);

    /// Parse only the descriptor of the current frame.
    ///
    /// Returns the number of bytes consumed and, once the whole descriptor
    /// has been seen, the frame metadata. `None` means every byte of `src`
    /// was consumed and more are needed.
    ///
    /// # Errors
    ///
    /// Any [`CodecError`] raised while validating the descriptor.
    fn read_frame_info(&mut self, src: &[u8]) -> Result<(usize, Option<FrameInfo>), CodecError>;

    /// Decode from `src` into `dst`.
    ///
    /// # Errors
    ///
    /// Any [`CodecError`]; the engine is unusable afterwards.
    fn decode(&mut self, src: &[u8], dst: &mut [u8]) -> Result<DecodeStep, CodecError>;

    /// Metadata of the frame being decoded (or the last one decoded).
    fn frame_info(&self) -> Option<&FrameInfo>;

    /// Frames fully decoded so far, skippable frames included.
    fn frames_completed(&self) -> u64;

    /// Signal that no more input will arrive.
    ///
    /// # Errors
    ///
    /// [`CodecError::Truncated`] if the engine is inside a frame or still
    /// holds output that was never drained.
    fn finish(&self) -> Result<(), CodecError>;

    /// Release engine buffers. Failure is informational: the engine is
    /// released either way.
    ///
    /// # Errors
    ///
    /// [`CodecError::Truncated`] if released in the middle of a frame.
    fn release(&mut self) -> Result<(), CodecError>;
}
