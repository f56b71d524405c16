use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::Level;
use lz4s_frame::{CodecError, DecoderOptions, FrameCodec, FrameDecoder, FrameInfo, MAGIC_SIZE};

use crate::compressed::CompressedBuffer;
use crate::config::{FrameMode, ReaderConfig};
use crate::decompressed::DecodedBuffer;
use crate::error::{FormatError, ReadError};
use crate::header::validate_magic;

/// Emit a log record only if the reader's configured verbosity allows it.
macro_rules! emit {
    ($config:expr, $level:expr, $($arg:tt)+) => {
        if $level <= $config.verbosity {
            log::log!($level, $($arg)+);
        }
    };
}

/// Lifecycle of a stream handle.
///
/// ```text
///   Opened ─▶ Validating ─▶ Streaming ─▶ Exhausted
///                 │             │
///                 └─────────────┴──▶ Failed
/// ```
///
/// A failure during `Validating` aborts construction, so a live handle is
/// only ever observed in `Streaming`, `Exhausted` or `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Opened,
    Validating,
    Streaming,
    Exhausted,
    Failed,
}

/// Counters reported by [`Lz4Reader::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Bytes read from the source, header included.
    pub compressed_bytes: u64,
    /// Bytes handed to the caller.
    pub decompressed_bytes: u64,
    /// Frames fully decoded, skippable frames included.
    pub frames: u64,
}

/// Pull-based reader that decompresses an LZ4 frame stream on demand.
///
/// Compressed bytes flow through two fixed-size buffers:
///
/// ```text
///   source ─▶ CompressedBuffer ─▶ FrameCodec ─▶ DecodedBuffer ─▶ caller
/// ```
///
/// The magic number and first frame descriptor are validated when the
/// reader is constructed. Reads may be any size; the reader refills and
/// decodes until the request is satisfied or the stream ends.
///
/// # Example
///
/// ```rust
/// use std::io::Read;
/// use lz4s_reader::{Lz4Reader, ReaderConfig};
///
/// // Empty frame: magic, descriptor, end mark, content checksum.
/// let frame = [
///     0x04, 0x22, 0x4D, 0x18, 0x64, 0x40, 0xA7,
///     0x00, 0x00, 0x00, 0x00, 0x05, 0x5D, 0xCC, 0x02,
/// ];
/// let mut reader = Lz4Reader::new(&frame[..], ReaderConfig::default()).unwrap();
/// let mut out = Vec::new();
/// reader.read_to_end(&mut out).unwrap();
/// assert!(out.is_empty());
/// ```
pub struct Lz4Reader<R, C = FrameDecoder> {
    source: R,
    codec: C,
    compressed: CompressedBuffer,
    decoded: DecodedBuffer,
    config: ReaderConfig,
    state: StreamState,
    delivered: u64,
    /// Set once the first frame ends in [`FrameMode::Single`].
    single_frame_done: bool,
}

/// Open `path` and validate its stream header.
///
/// # Errors
///
/// See [`Lz4Reader::open`].
pub fn open(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Lz4Reader<File>, ReadError> {
    Lz4Reader::open(path, config)
}

impl Lz4Reader<File> {
    /// Open `path` for reading and validate its stream header.
    ///
    /// # Errors
    ///
    /// - [`ReadError::Open`] if the file cannot be opened.
    /// - Any error from [`Lz4Reader::new`].
    pub fn open(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        emit!(config, Level::Debug, "opened {}", path.display());
        Self::new(file, config)
    }
}

impl<R: Read> Lz4Reader<R> {
    /// Wrap `source` with the built-in LZ4 frame decoder.
    ///
    /// # Errors
    ///
    /// - [`ReadError::CodecInit`] if the decoder cannot allocate its tables.
    /// - Any error from [`Lz4Reader::with_codec`].
    pub fn new(source: R, config: ReaderConfig) -> Result<Self, ReadError> {
        config.validate()?;
        let codec = FrameDecoder::new(DecoderOptions {
            verify_checksums: config.verify_checksums,
        })
        .map_err(ReadError::CodecInit)?;
        Self::with_codec(source, config, codec)
    }
}

impl<R: Read, C: FrameCodec> Lz4Reader<R, C> {
    /// Wrap `source` with an explicit engine.
    ///
    /// Allocates both buffers, reads until the magic number is available,
    /// validates it and parses the first frame descriptor.
    ///
    /// # Errors
    ///
    /// - [`ReadError::InvalidConfig`] if `config` fails validation.
    /// - [`ReadError::Allocation`] if a buffer cannot be reserved.
    /// - [`ReadError::Format`] if the magic number or descriptor is bad.
    /// - [`ReadError::Io`] if the source fails.
    pub fn with_codec(source: R, config: ReaderConfig, codec: C) -> Result<Self, ReadError> {
        config.validate()?;
        let mut reader = Self {
            compressed: CompressedBuffer::with_capacity(config.compressed_capacity)?,
            decoded: DecodedBuffer::with_capacity(config.decompressed_capacity)?,
            source,
            codec,
            config,
            state: StreamState::Opened,
            delivered: 0,
            single_frame_done: false,
        };

        reader.state = StreamState::Validating;
        reader.validate_header()?;
        if let Some(info) = reader.codec.frame_info() {
            emit!(reader.config, Level::Debug, "frame: {info}");
        }
        reader.state = StreamState::Streaming;
        Ok(reader)
    }

    /// Read up to `buf.len()` decompressed bytes.
    ///
    /// Returns `0` at end of stream, and immediately for an empty `buf`.
    /// Bytes already copied into `buf` when an error occurs stay there.
    ///
    /// # Errors
    ///
    /// - [`ReadError::Io`] if the source fails.
    /// - [`ReadError::Codec`] if the data is corrupt or the source ends
    ///   inside a frame.
    /// - [`ReadError::Stalled`] if the engine stops making progress.
    /// - [`ReadError::Failed`] if an earlier call failed.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.state {
            StreamState::Exhausted => return Ok(0),
            StreamState::Failed => return Err(ReadError::Failed),
            _ => {}
        }

        let mut copied = 0;
        let outcome = loop {
            copied += self.decoded.copy_out(&mut buf[copied..]);
            if copied == buf.len() {
                break Ok(());
            }
            match self.fill_decoded() {
                Ok(0) => {
                    self.state = StreamState::Exhausted;
                    emit!(
                        self.config,
                        Level::Trace,
                        "end of stream after {} bytes",
                        self.delivered + copied as u64
                    );
                    break Ok(());
                }
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        };

        self.delivered += copied as u64;
        match outcome {
            Ok(()) => Ok(copied),
            Err(e) => {
                self.state = StreamState::Failed;
                emit!(self.config, Level::Error, "stream failed: {e}");
                Err(e)
            }
        }
    }

    /// Release the engine, both buffers and the source.
    ///
    /// An engine release failure is logged, not returned.
    pub fn close(mut self) {
        if let Err(e) = self.codec.release() {
            emit!(self.config, Level::Warn, "decoder release reported: {e}");
        }
        self.compressed.release();
        self.decoded.release();
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Metadata of the frame currently being decoded.
    #[must_use]
    pub fn frame_info(&self) -> Option<&FrameInfo> {
        self.codec.frame_info()
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        StreamStats {
            compressed_bytes: self.compressed.total_read(),
            decompressed_bytes: self.delivered,
            frames: self.codec.frames_completed(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Consume the magic number and prime the engine with the first
    /// frame descriptor.
    fn validate_header(&mut self) -> Result<(), ReadError> {
        self.compressed.fill_at_least(&mut self.source, MAGIC_SIZE)?;
        let used = validate_magic(self.compressed.unconsumed())?;
        self.compressed.consume(used);
        self.codec.begin_frame();

        loop {
            let (used, info) = self
                .codec
                .read_frame_info(self.compressed.unconsumed())
                .map_err(descriptor_error)?;
            self.compressed.consume(used);
            if info.is_some() {
                return Ok(());
            }
            if !self.compressed.is_exhausted() {
                return Err(ReadError::Stalled {
                    unconsumed: self.compressed.unconsumed().len(),
                });
            }
            if self.compressed.refill(&mut self.source)? == 0 {
                return Err(FormatError::TruncatedDescriptor.into());
            }
        }
    }

    /// Decode a new batch into the decoded buffer.
    ///
    /// Stops when the buffer is full, a frame completes with output
    /// pending, or the source is drained. Returns the batch length; `0`
    /// means end of stream.
    fn fill_decoded(&mut self) -> Result<usize, ReadError> {
        self.decoded.reset();
        if self.single_frame_done {
            return Ok(0);
        }

        loop {
            let step = self
                .codec
                .decode(self.compressed.unconsumed(), self.decoded.spare_mut())?;
            self.compressed.consume(step.consumed);
            self.decoded.commit(step.produced);

            let frame_ended = step.is_frame_complete() && step.made_progress();
            if frame_ended {
                emit!(
                    self.config,
                    Level::Trace,
                    "frame {} complete",
                    self.codec.frames_completed()
                );
                if self.config.frame_mode == FrameMode::Single {
                    self.single_frame_done = true;
                    let trailing = self.compressed.unconsumed().len();
                    if trailing > 0 {
                        emit!(
                            self.config,
                            Level::Warn,
                            "ignoring {trailing} buffered bytes after the first frame"
                        );
                    }
                    break;
                }
            }
            if self.decoded.is_full() || (frame_ended && !self.decoded.is_empty()) {
                break;
            }
            if step.made_progress() {
                continue;
            }

            if !self.compressed.is_exhausted() {
                return Err(ReadError::Stalled {
                    unconsumed: self.compressed.unconsumed().len(),
                });
            }
            if !self.decoded.is_empty() {
                break;
            }
            let n = if self.compressed.source_drained() {
                0
            } else {
                self.compressed.refill(&mut self.source)?
            };
            if n == 0 {
                self.codec.finish()?;
                break;
            }
            emit!(self.config, Level::Trace, "refilled {n} compressed bytes");
        }
        Ok(self.decoded.len())
    }
}

/// Engine allocation failures stay allocation errors; anything else the
/// descriptor parse raises is a format error.
fn descriptor_error(err: CodecError) -> ReadError {
    match err {
        CodecError::Allocation { requested } => ReadError::Allocation { requested },
        other => FormatError::Descriptor(other).into(),
    }
}

impl<R: Read, C: FrameCodec> Read for Lz4Reader<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Lz4Reader::read(self, buf).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use lz4s_frame::{BlockMode, BlockSize, DecodeStep};

    use super::*;

    const HELLO_FRAME: [u8; 20] = [
        0x04, 0x22, 0x4D, 0x18, 0x60, 0x40, 0x82, 0x05, 0x00, 0x00, 0x80, b'h', b'e', b'l', b'l',
        b'o', 0x00, 0x00, 0x00, 0x00,
    ];

    const EMPTY_FRAME: [u8; 15] = [
        0x04, 0x22, 0x4D, 0x18, 0x64, 0x40, 0xA7, 0x00, 0x00, 0x00, 0x00, 0x05, 0x5D, 0xCC, 0x02,
    ];

    fn read_all<R: Read, C: FrameCodec>(reader: &mut Lz4Reader<R, C>, chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Accepts the descriptor without consuming anything, then never moves.
    struct StuckCodec;

    impl FrameCodec for StuckCodec {
        fn begin_frame(&mut self) {}

        fn read_frame_info(
            &mut self,
            _src: &[u8],
        ) -> Result<(usize, Option<FrameInfo>), CodecError> {
            Ok((
                0,
                Some(FrameInfo {
                    block_size: BlockSize::Max64KB,
                    block_mode: BlockMode::Independent,
                    block_checksums: false,
                    content_checksum: false,
                    content_size: None,
                    dict_id: None,
                }),
            ))
        }

        fn decode(&mut self, _src: &[u8], _dst: &mut [u8]) -> Result<DecodeStep, CodecError> {
            Ok(DecodeStep {
                consumed: 0,
                produced: 0,
                hint: 4,
            })
        }

        fn frame_info(&self) -> Option<&FrameInfo> {
            None
        }

        fn frames_completed(&self) -> u64 {
            0
        }

        fn finish(&self) -> Result<(), CodecError> {
            Ok(())
        }

        fn release(&mut self) -> Result<(), CodecError> {
            Err(CodecError::Truncated { needed: 4 })
        }
    }

    /// Fails to reserve its block buffer while parsing the descriptor.
    struct OutOfMemoryCodec;

    impl FrameCodec for OutOfMemoryCodec {
        fn begin_frame(&mut self) {}

        fn read_frame_info(
            &mut self,
            _src: &[u8],
        ) -> Result<(usize, Option<FrameInfo>), CodecError> {
            Err(CodecError::Allocation {
                requested: 4 << 20,
            })
        }

        fn decode(&mut self, _src: &[u8], _dst: &mut [u8]) -> Result<DecodeStep, CodecError> {
            Ok(DecodeStep::default())
        }

        fn frame_info(&self) -> Option<&FrameInfo> {
            None
        }

        fn frames_completed(&self) -> u64 {
            0
        }

        fn finish(&self) -> Result<(), CodecError> {
            Ok(())
        }

        fn release(&mut self) -> Result<(), CodecError> {
            Ok(())
        }
    }

    #[test]
    fn reads_stored_block() {
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..], ReaderConfig::default()).unwrap();
        assert_eq!(reader.state(), StreamState::Streaming);
        assert_eq!(reader.frame_info().unwrap().block_size, BlockSize::Max64KB);
        assert_eq!(read_all(&mut reader, 3), b"hello");
        assert_eq!(reader.state(), StreamState::Exhausted);
        assert_eq!(
            reader.stats(),
            StreamStats {
                compressed_bytes: 20,
                decompressed_bytes: 5,
                frames: 1,
            }
        );
        reader.close();
    }

    #[test]
    fn empty_payload_reads_zero() {
        let mut reader = Lz4Reader::new(&EMPTY_FRAME[..], ReaderConfig::default()).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.state(), StreamState::Exhausted);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn empty_request_changes_nothing() {
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..], ReaderConfig::default()).unwrap();
        assert_eq!(reader.read(&mut []).unwrap(), 0);
        assert_eq!(reader.state(), StreamState::Streaming);
        assert_eq!(reader.stats().decompressed_bytes, 0);
    }

    #[test]
    fn tiny_buffers_still_decode() {
        let config = ReaderConfig {
            compressed_capacity: 4,
            decompressed_capacity: 1,
            ..ReaderConfig::default()
        };
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..], config).unwrap();
        assert_eq!(read_all(&mut reader, 2), b"hello");
    }

    #[test]
    fn bad_magic_rejected_at_open() {
        let mut data = HELLO_FRAME;
        data[0] = 0x05;
        let result = Lz4Reader::new(&data[..], ReaderConfig::default());
        assert!(matches!(
            result,
            Err(ReadError::Format(FormatError::BadMagic { found: 0x184D_2205 }))
        ));
    }

    #[test]
    fn short_source_rejected_at_open() {
        let result = Lz4Reader::new(&HELLO_FRAME[..3], ReaderConfig::default());
        assert!(matches!(
            result,
            Err(ReadError::Format(FormatError::ShortMagic { available: 3 }))
        ));
    }

    #[test]
    fn truncated_descriptor_rejected_at_open() {
        let result = Lz4Reader::new(&HELLO_FRAME[..6], ReaderConfig::default());
        assert!(matches!(
            result,
            Err(ReadError::Format(FormatError::TruncatedDescriptor))
        ));
    }

    #[test]
    fn malformed_descriptor_rejected_at_open() {
        let mut data = HELLO_FRAME;
        data[4] = 0x20; // version bits 00
        let result = Lz4Reader::new(&data[..], ReaderConfig::default());
        assert!(matches!(
            result,
            Err(ReadError::Format(FormatError::Descriptor(CodecError::UnsupportedVersion { .. })))
        ));
    }

    #[test]
    fn block_buffer_allocation_failure_at_open() {
        let result =
            Lz4Reader::with_codec(&HELLO_FRAME[..], ReaderConfig::default(), OutOfMemoryCodec);
        assert!(matches!(
            result,
            Err(ReadError::Allocation { requested }) if requested == 4 << 20
        ));
    }

    #[test]
    fn invalid_config_rejected_before_reading() {
        let config = ReaderConfig {
            compressed_capacity: 2,
            ..ReaderConfig::default()
        };
        let result = Lz4Reader::new(&HELLO_FRAME[..], config);
        assert!(matches!(result, Err(ReadError::InvalidConfig { .. })));
    }

    #[test]
    fn truncated_body_fails_then_stays_failed() {
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..13], ReaderConfig::default()).unwrap();
        let mut buf = [0u8; 16];
        let err = reader.read(&mut buf).unwrap_err();
        assert!(matches!(err, ReadError::Codec(CodecError::Truncated { .. })));
        assert_eq!(reader.state(), StreamState::Failed);
        assert!(matches!(reader.read(&mut buf), Err(ReadError::Failed)));
        reader.close();
    }

    #[test]
    fn close_mid_frame_after_partial_read() {
        let config = ReaderConfig {
            decompressed_capacity: 2,
            ..ReaderConfig::default()
        };
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..], config).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"he");
        assert_eq!(reader.state(), StreamState::Streaming);
        assert_eq!(reader.stats().frames, 0);
        // the engine still holds "llo" and the end mark is unread
        reader.close();
    }

    #[test]
    fn missing_end_mark_is_truncation() {
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..16], ReaderConfig::default()).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"hel");
        let mut rest = [0u8; 8];
        let err = reader.read(&mut rest).unwrap_err();
        assert!(matches!(err, ReadError::Codec(CodecError::Truncated { .. })));
        assert_eq!(&rest[..2], b"lo");
        assert_eq!(reader.stats().decompressed_bytes, 5);
    }

    #[test]
    fn concatenated_frames_by_default() {
        let data = [HELLO_FRAME, HELLO_FRAME].concat();
        let mut reader = Lz4Reader::new(Cursor::new(data), ReaderConfig::default()).unwrap();
        assert_eq!(read_all(&mut reader, 64), b"hellohello");
        assert_eq!(reader.stats().frames, 2);
    }

    #[test]
    fn single_mode_stops_after_first_frame() {
        let data = [HELLO_FRAME, HELLO_FRAME].concat();
        let config = ReaderConfig {
            frame_mode: FrameMode::Single,
            ..ReaderConfig::default()
        };
        let mut reader = Lz4Reader::new(Cursor::new(data), config).unwrap();
        assert_eq!(read_all(&mut reader, 64), b"hello");
        assert_eq!(reader.stats().frames, 1);
    }

    #[test]
    fn stuck_codec_reports_stall() {
        let data = [0x04, 0x22, 0x4D, 0x18, 1, 2, 3, 4];
        let mut reader =
            Lz4Reader::with_codec(&data[..], ReaderConfig::default(), StuckCodec).unwrap();
        let err = reader.read(&mut [0u8; 4]).unwrap_err();
        assert!(matches!(err, ReadError::Stalled { unconsumed: 4 }));
        // release failure is swallowed
        reader.close();
    }

    #[test]
    fn io_read_impl_composes_with_std() {
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..], ReaderConfig::default()).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn io_read_impl_maps_truncation() {
        let mut reader = Lz4Reader::new(&HELLO_FRAME[..13], ReaderConfig::default()).unwrap();
        let err = io::copy(&mut reader, &mut io::sink()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn open_missing_file() {
        let result = open("/nonexistent/lz4s/input.lz4", ReaderConfig::default());
        assert!(matches!(result, Err(ReadError::Open { .. })));
    }

    #[test]
    fn linked_frame_from_companion_encoder() {
        use lz4_flex::frame::{BlockMode as FlexMode, FrameEncoder};
        use std::io::Write;

        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let info = lz4_flex::frame::FrameInfo::new()
            .block_mode(FlexMode::Linked)
            .content_checksum(true);
        let mut encoder = FrameEncoder::with_frame_info(info, Vec::new());
        encoder.write_all(&data).unwrap();
        let frame = encoder.finish().unwrap();

        let config = ReaderConfig {
            compressed_capacity: 1000,
            decompressed_capacity: 777,
            ..ReaderConfig::default()
        };
        let mut reader = Lz4Reader::new(Cursor::new(frame), config).unwrap();
        assert_eq!(read_all(&mut reader, 4096), data);
    }
}
