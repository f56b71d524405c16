use lz4_flex::block::{DecompressError, decompress_into, decompress_into_with_dict};
use xxhash_rust::xxh32::Xxh32;

use crate::descriptor::{BlockMode, FrameInfo};
use crate::error::CodecError;

/// How far back a linked block may reach into earlier output.
pub const WINDOW_SIZE: usize = 64 * 1024;

/// Grow `buf`'s capacity to at least `len` without aborting on failure.
pub(crate) fn try_alloc(buf: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    if buf.capacity() >= len {
        return Ok(());
    }
    buf.try_reserve_exact(len - buf.len())
        .map_err(|_| CodecError::Allocation { requested: len })
}

fn corrupt(err: DecompressError) -> CodecError {
    CodecError::CorruptBlock(err.to_string())
}

/// Output side of the engine: the decoded bytes of the most recent block,
/// how many of them were handed out, and the history linked blocks decode
/// against.
///
/// A block is decoded in one piece into `block` and drained from there in
/// whatever chunk sizes the caller offers. The engine does not accept the
/// next block until the previous one is fully drained.
pub(crate) struct Window {
    block: Vec<u8>,
    limit: usize,
    filled: usize,
    flushed: usize,
    /// Last `WINDOW_SIZE` bytes of frame output; only kept for linked frames.
    history: Vec<u8>,
    linked: bool,
    hasher: Option<Xxh32>,
    content_len: u64,
}

impl Window {
    pub(crate) fn new() -> Result<Self, CodecError> {
        let mut history = Vec::new();
        try_alloc(&mut history, WINDOW_SIZE)?;
        Ok(Self {
            block: Vec::new(),
            limit: 0,
            filled: 0,
            flushed: 0,
            history,
            linked: false,
            hasher: None,
            content_len: 0,
        })
    }

    /// Prepare for a new frame. Only grows the block buffer, so a stream of
    /// frames with the same block maximum allocates once.
    pub(crate) fn start(&mut self, info: &FrameInfo, verify: bool) -> Result<(), CodecError> {
        let limit = info.block_size.bytes();
        if self.block.len() < limit {
            try_alloc(&mut self.block, limit)?;
            self.block.resize(limit, 0);
        }
        self.limit = limit;
        self.filled = 0;
        self.flushed = 0;
        self.history.clear();
        self.linked = info.block_mode == BlockMode::Linked;
        self.hasher = (verify && info.content_checksum).then(|| Xxh32::new(0));
        self.content_len = 0;
        Ok(())
    }

    /// Decode one block body. Must only be called once the previous block
    /// has been drained.
    pub(crate) fn decode_block(&mut self, body: &[u8], compressed: bool) -> Result<(), CodecError> {
        debug_assert_eq!(self.pending(), 0);

        let out = &mut self.block[..self.limit];
        let written = if !compressed {
            if body.len() > out.len() {
                return Err(CodecError::BlockTooLarge {
                    size: body.len(),
                    max: out.len(),
                });
            }
            out[..body.len()].copy_from_slice(body);
            body.len()
        } else if self.linked && !self.history.is_empty() {
            decompress_into_with_dict(body, out, &self.history).map_err(corrupt)?
        } else {
            decompress_into(body, out).map_err(corrupt)?
        };

        self.filled = written;
        self.flushed = 0;
        self.content_len += written as u64;

        let decoded = &self.block[..written];
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(decoded);
        }
        if self.linked {
            remember(&mut self.history, decoded);
        }
        Ok(())
    }

    /// Copy as much pending output as fits into `dst`.
    pub(crate) fn flush_into(&mut self, dst: &mut [u8]) -> usize {
        let n = self.pending().min(dst.len());
        dst[..n].copy_from_slice(&self.block[self.flushed..self.flushed + n]);
        self.flushed += n;
        n
    }

    pub(crate) fn pending(&self) -> usize {
        self.filled - self.flushed
    }

    /// Bytes decoded in the current frame.
    pub(crate) fn content_len(&self) -> u64 {
        self.content_len
    }

    /// xxh32 of the frame content so far, when content checks are enabled.
    pub(crate) fn content_digest(&self) -> Option<u32> {
        self.hasher.as_ref().map(Xxh32::digest)
    }

    pub(crate) fn free(&mut self) {
        self.block = Vec::new();
        self.history = Vec::new();
        self.limit = 0;
        self.filled = 0;
        self.flushed = 0;
    }
}

/// Append `decoded` to the rolling history, keeping the last `WINDOW_SIZE` bytes.
fn remember(history: &mut Vec<u8>, decoded: &[u8]) {
    if decoded.len() >= WINDOW_SIZE {
        history.clear();
        history.extend_from_slice(&decoded[decoded.len() - WINDOW_SIZE..]);
    } else {
        let excess = (history.len() + decoded.len()).saturating_sub(WINDOW_SIZE);
        history.drain(..excess);
        history.extend_from_slice(decoded);
    }
}
