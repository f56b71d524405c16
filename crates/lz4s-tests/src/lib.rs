//! Shared fixtures for the lz4s integration tests, golden generator and
//! benchmarks.
//!
//! - [`compress`] / [`compress_with`] produce frames with lz4_flex's
//!   encoder, the companion to our decoder.
//! - [`FrameBuilder`] assembles frames byte by byte, for cases an encoder
//!   would never emit (stored blocks at exact sizes, wrong checksums,
//!   lying content sizes).
//! - The reader wrappers simulate sources that return short reads, count
//!   their calls, or fail.

use std::cell::Cell;
use std::io::{self, Read, Write};
use std::rc::Rc;

use lz4_flex::frame::FrameEncoder;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use xxhash_rust::xxh32::xxh32;

pub use lz4_flex::frame::{BlockMode as EncoderBlockMode, BlockSize as EncoderBlockSize};
pub use lz4_flex::frame::FrameInfo as EncoderOptions;

// ── Companion encoder ─────────────────────────────────────────────────────────

/// Compress `data` into one frame with lz4_flex's defaults.
#[must_use]
pub fn compress(data: &[u8]) -> Vec<u8> {
    compress_with(data, EncoderOptions::new())
}

/// Compress `data` into one frame with explicit encoder options.
///
/// # Panics
///
/// If the in-memory encoder fails, which only happens on allocation failure.
#[must_use]
pub fn compress_with(data: &[u8], options: EncoderOptions) -> Vec<u8> {
    let mut encoder = FrameEncoder::with_frame_info(options, Vec::new());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory finish")
}

/// Every combination of block mode and checksum flags at a given block size.
#[must_use]
pub fn encoder_matrix(block_size: EncoderBlockSize) -> Vec<EncoderOptions> {
    let mut out = Vec::new();
    for mode in [EncoderBlockMode::Independent, EncoderBlockMode::Linked] {
        for block_checksums in [false, true] {
            for content_checksum in [false, true] {
                out.push(
                    EncoderOptions::new()
                        .block_size(block_size)
                        .block_mode(mode)
                        .block_checksums(block_checksums)
                        .content_checksum(content_checksum),
                );
            }
        }
    }
    out
}

// ── Hand-assembled frames ─────────────────────────────────────────────────────

const MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];

/// One data block as it will appear on the wire.
#[derive(Clone, Debug)]
struct RawBlock {
    body: Vec<u8>,
    stored: bool,
    decoded_len: usize,
}

/// Byte-level LZ4 frame assembler.
///
/// ```rust
/// use lz4s_tests::FrameBuilder;
///
/// let frame = FrameBuilder::new().stored_block(b"hello").build();
/// assert_eq!(
///     hex::encode(&frame),
///     "04224d186040820500008068656c6c6f00000000"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct FrameBuilder {
    block_size_id: u8,
    independent: bool,
    block_checksums: bool,
    content_checksum: bool,
    content_size: bool,
    declared_size: Option<u64>,
    dict_id: Option<u32>,
    blocks: Vec<RawBlock>,
    content: Vec<u8>,
    corrupt_block_checksum: bool,
    corrupt_content_checksum: bool,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    /// Independent blocks, 64 KiB maximum, no optional fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            block_size_id: 4,
            independent: true,
            block_checksums: false,
            content_checksum: false,
            content_size: false,
            declared_size: None,
            dict_id: None,
            blocks: Vec::new(),
            content: Vec::new(),
            corrupt_block_checksum: false,
            corrupt_content_checksum: false,
        }
    }

    #[must_use]
    pub fn block_size_id(mut self, id: u8) -> Self {
        self.block_size_id = id;
        self
    }

    #[must_use]
    pub fn linked(mut self) -> Self {
        self.independent = false;
        self
    }

    #[must_use]
    pub fn block_checksums(mut self) -> Self {
        self.block_checksums = true;
        self
    }

    #[must_use]
    pub fn content_checksum(mut self) -> Self {
        self.content_checksum = true;
        self
    }

    /// Record the real content size in the descriptor.
    #[must_use]
    pub fn content_size(mut self) -> Self {
        self.content_size = true;
        self
    }

    /// Record `size` in the descriptor regardless of the real content.
    #[must_use]
    pub fn declared_size(mut self, size: u64) -> Self {
        self.content_size = true;
        self.declared_size = Some(size);
        self
    }

    #[must_use]
    pub fn dict_id(mut self, id: u32) -> Self {
        self.dict_id = Some(id);
        self
    }

    /// Append a block stored uncompressed.
    #[must_use]
    pub fn stored_block(mut self, data: &[u8]) -> Self {
        self.blocks.push(RawBlock {
            body: data.to_vec(),
            stored: true,
            decoded_len: data.len(),
        });
        self.content.extend_from_slice(data);
        self
    }

    /// Append a compressed block made of a single literal run.
    #[must_use]
    pub fn literal_block(mut self, data: &[u8]) -> Self {
        let mut body = Vec::with_capacity(data.len() + data.len() / 255 + 2);
        if data.len() < 15 {
            body.push(u8::try_from(data.len()).unwrap_or(0) << 4);
        } else {
            body.push(0xF0);
            let mut rest = data.len() - 15;
            while rest >= 255 {
                body.push(255);
                rest -= 255;
            }
            body.push(u8::try_from(rest).unwrap_or(u8::MAX));
        }
        body.extend_from_slice(data);
        self.blocks.push(RawBlock {
            body,
            stored: false,
            decoded_len: data.len(),
        });
        self.content.extend_from_slice(data);
        self
    }

    /// Flip a bit in every block checksum.
    #[must_use]
    pub fn corrupt_block_checksum(mut self) -> Self {
        self.block_checksums = true;
        self.corrupt_block_checksum = true;
        self
    }

    /// Flip a bit in the content checksum.
    #[must_use]
    pub fn corrupt_content_checksum(mut self) -> Self {
        self.content_checksum = true;
        self.corrupt_content_checksum = true;
        self
    }

    /// Decoded bytes this frame should produce.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Length of the frame descriptor, header checksum included.
    #[must_use]
    pub fn descriptor_len(&self) -> usize {
        3 + 8 * usize::from(self.content_size) + 4 * usize::from(self.dict_id.is_some())
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut flg = 0b0100_0000;
        if self.independent {
            flg |= 0b0010_0000;
        }
        if self.block_checksums {
            flg |= 0b0001_0000;
        }
        if self.content_size {
            flg |= 0b0000_1000;
        }
        if self.content_checksum {
            flg |= 0b0000_0100;
        }
        if self.dict_id.is_some() {
            flg |= 0b0000_0001;
        }

        let mut descriptor = vec![flg, self.block_size_id << 4];
        if self.content_size {
            let size = self
                .declared_size
                .unwrap_or(self.blocks.iter().map(|b| b.decoded_len as u64).sum());
            descriptor.extend_from_slice(&size.to_le_bytes());
        }
        if let Some(id) = self.dict_id {
            descriptor.extend_from_slice(&id.to_le_bytes());
        }
        let hc = header_checksum(&descriptor);

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&descriptor);
        out.push(hc);
        for block in &self.blocks {
            let mut header = u32::try_from(block.body.len()).expect("block fits in 31 bits");
            if block.stored {
                header |= 0x8000_0000;
            }
            out.extend_from_slice(&header.to_le_bytes());
            out.extend_from_slice(&block.body);
            if self.block_checksums {
                let mut sum = xxh32(&block.body, 0);
                if self.corrupt_block_checksum {
                    sum ^= 1;
                }
                out.extend_from_slice(&sum.to_le_bytes());
            }
        }
        out.extend_from_slice(&[0, 0, 0, 0]);
        if self.content_checksum {
            let mut sum = xxh32(&self.content, 0);
            if self.corrupt_content_checksum {
                sum ^= 1;
            }
            out.extend_from_slice(&sum.to_le_bytes());
        }
        out
    }
}

/// Header checksum byte for a descriptor (FLG through dictionary id).
#[must_use]
pub fn header_checksum(descriptor: &[u8]) -> u8 {
    xxh32(descriptor, 0).to_le_bytes()[1]
}

/// A skippable frame with magic `0x184D2A50 | nibble`.
#[must_use]
pub fn skippable_frame(nibble: u8, payload: &[u8]) -> Vec<u8> {
    let magic = 0x184D_2A50 | u32::from(nibble & 0x0F);
    let mut out = magic.to_le_bytes().to_vec();
    let len = u32::try_from(payload.len()).expect("skippable payload fits in u32");
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

// ── Golden fixtures ───────────────────────────────────────────────────────────

/// A committed fixture under `tests/golden/`.
pub struct GoldenFixture {
    pub name: &'static str,
    pub frame: Vec<u8>,
    /// Decoded stream content.
    pub content: Vec<u8>,
}

/// Every golden fixture, built from scratch.
///
/// `generate_golden` writes these to disk; the conformance suite checks
/// that the committed files still match.
#[must_use]
pub fn golden_fixtures() -> Vec<GoldenFixture> {
    let hello = FrameBuilder::new().stored_block(b"hello");
    let all_flags = FrameBuilder::new()
        .block_checksums()
        .content_checksum()
        .content_size()
        .literal_block(b"lz4 stream");

    let mut concatenated = hello.build();
    concatenated.extend_from_slice(&skippable_frame(0, b"skip"));
    concatenated.extend_from_slice(&all_flags.build());

    let fixture = |name, builder: &FrameBuilder| GoldenFixture {
        name,
        frame: builder.build(),
        content: builder.content().to_vec(),
    };

    vec![
        fixture("empty.lz4", &FrameBuilder::new().content_checksum()),
        fixture("hello_stored.lz4", &hello),
        fixture("all_flags.lz4", &all_flags),
        fixture(
            "dict_id.lz4",
            &FrameBuilder::new().dict_id(0xDEAD_BEEF).stored_block(b"hi"),
        ),
        fixture(
            "two_blocks_4mb.lz4",
            &FrameBuilder::new()
                .block_size_id(7)
                .block_checksums()
                .content_checksum()
                .stored_block(b"first ")
                .literal_block(b"second"),
        ),
        GoldenFixture {
            name: "concatenated.lz4",
            frame: concatenated,
            content: b"hellolz4 stream".to_vec(),
        },
    ]
}

// ── Payload generators ────────────────────────────────────────────────────────

/// Compressible text-like bytes, deterministic per seed.
#[must_use]
pub fn text_payload(len: usize, seed: u64) -> Vec<u8> {
    const WORDS: [&[u8]; 8] = [
        b"frame ", b"block ", b"stream ", b"buffer ", b"cursor ", b"magic ", b"window ", b"\n",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        out.extend_from_slice(WORDS[rng.gen_range(0..WORDS.len())]);
    }
    out.truncate(len);
    out
}

/// Incompressible bytes, deterministic per seed.
#[must_use]
pub fn random_payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill_bytes(&mut out);
    out
}

// ── Source wrappers ───────────────────────────────────────────────────────────

/// Returns at most `chunk` bytes per read, and `Interrupted` before every
/// `interrupt_every`-th read when that is non-zero.
pub struct ChunkedReader<R> {
    inner: R,
    chunk: usize,
    interrupt_every: usize,
    calls: usize,
}

impl<R: Read> ChunkedReader<R> {
    pub fn new(inner: R, chunk: usize) -> Self {
        Self {
            inner,
            chunk: chunk.max(1),
            interrupt_every: 0,
            calls: 0,
        }
    }

    #[must_use]
    pub fn interrupt_every(mut self, n: usize) -> Self {
        self.interrupt_every = n;
        self
    }
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls += 1;
        if self.interrupt_every > 0 && self.calls % self.interrupt_every == 0 {
            return Err(io::ErrorKind::Interrupted.into());
        }
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

/// Read-call counter shared between a [`CountingReader`] and the test.
#[derive(Clone, Debug, Default)]
pub struct ReadCounter {
    calls: Rc<Cell<usize>>,
}

impl ReadCounter {
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

/// Counts every call into the wrapped source.
pub struct CountingReader<R> {
    inner: R,
    counter: ReadCounter,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> (Self, ReadCounter) {
        let counter = ReadCounter::default();
        (
            Self {
                inner,
                counter: counter.clone(),
            },
            counter,
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.counter.calls.set(self.counter.calls.get() + 1);
        self.inner.read(buf)
    }
}

/// Serves `data`, then fails every read with `kind`.
pub struct FailingReader {
    data: io::Cursor<Vec<u8>>,
    kind: io::ErrorKind,
}

impl FailingReader {
    #[must_use]
    pub fn new(data: Vec<u8>, kind: io::ErrorKind) -> Self {
        Self {
            data: io::Cursor::new(data),
            kind,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(self.kind, "injected source failure")),
            n => Ok(n),
        }
    }
}

// ── Drivers ───────────────────────────────────────────────────────────────────

/// Drain `reader` with requests cycling through `sizes`.
///
/// # Errors
///
/// The first error `reader` returns.
pub fn read_cycling<R: Read>(reader: &mut R, sizes: &[usize]) -> io::Result<Vec<u8>> {
    let max = sizes.iter().copied().max().unwrap_or(1).max(1);
    let mut buf = vec![0u8; max];
    let mut out = Vec::new();
    for &size in sizes.iter().cycle() {
        let n = reader.read(&mut buf[..size.max(1)])?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_matches_known_vectors() {
        let empty = FrameBuilder::new().content_checksum().build();
        assert_eq!(hex::encode(empty), "04224d186440a700000000055dcc02");

        let checked = FrameBuilder::new()
            .block_checksums()
            .content_checksum()
            .content_size()
            .literal_block(b"lz4 stream")
            .build();
        assert_eq!(
            hex::encode(checked),
            "04224d187c400a00000000000000df0b000000a06c7a342073747265616d40cc1daa000000007cc8fe20"
        );
    }

    #[test]
    fn long_literal_run_length_encoding() {
        let data = vec![b'x'; 15 + 255 + 3];
        let frame = FrameBuilder::new().literal_block(&data).build();
        // magic + descriptor + block header, then token and length bytes
        assert_eq!(&frame[11..14], &[0xF0, 255, 3]);
    }

    #[test]
    fn skippable_frame_layout() {
        assert_eq!(hex::encode(skippable_frame(0, b"skip")), "502a4d1804000000736b6970");
    }

    #[test]
    fn payloads_are_deterministic() {
        assert_eq!(text_payload(1000, 7), text_payload(1000, 7));
        assert_ne!(random_payload(64, 1), random_payload(64, 2));
    }
}
