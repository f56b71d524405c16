use std::io;
use std::path::PathBuf;

use lz4s_frame::CodecError;

/// Errors raised while opening or reading an LZ4 stream.
///
/// Open-time errors mean no handle was produced. Read-time errors leave
/// the handle in the `Failed` state; only `close` remains meaningful.
///
/// ```text
///   ReadError
///   ├── Format(FormatError)    ← magic or frame descriptor rejected at open
///   ├── Open { path, source }  ← file could not be opened
///   ├── Io(io::Error)          ← source read failed
///   ├── Codec(CodecError)      ← engine rejected data mid-stream
///   ├── Allocation             ← buffer could not be reserved
///   ├── CodecInit(CodecError)  ← engine could not be constructed
///   ├── InvalidConfig          ← ReaderConfig failed validation
///   ├── Stalled                ← engine made no progress on available input
///   └── Failed                 ← read after a terminal error
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("invalid stream header: {0}")]
    Format(#[from] FormatError),

    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    /// The engine rejected the compressed data. A source that ends inside
    /// a frame lands here as [`CodecError::Truncated`].
    #[error("decompression failed: {0}")]
    Codec(#[from] CodecError),

    #[error("cannot allocate {requested} bytes for stream buffers")]
    Allocation { requested: usize },

    #[error("cannot initialise decompression engine: {0}")]
    CodecInit(CodecError),

    #[error("invalid reader configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The engine reported neither consumed nor produced bytes while
    /// compressed input was still available.
    #[error("decompression engine made no progress with {unconsumed} bytes buffered")]
    Stalled { unconsumed: usize },

    #[error("stream is in a failed state after an earlier error")]
    Failed,
}

/// Reasons the stream header was rejected at open.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Source ended before the four magic bytes.
    #[error("unreadable header: only {available} of 4 magic bytes present")]
    ShortMagic { available: usize },

    #[error("unrecognized header: magic {found:#010X}, expected 0x184D2204")]
    BadMagic { found: u32 },

    /// The frame descriptor following the magic is malformed.
    #[error("bad frame descriptor: {0}")]
    Descriptor(CodecError),

    /// Source ended inside the frame descriptor.
    #[error("source ended inside the frame descriptor")]
    TruncatedDescriptor,
}

impl From<ReadError> for io::Error {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Io(inner) | ReadError::Open { source: inner, .. } => inner,
            ReadError::Codec(CodecError::Truncated { .. })
            | ReadError::Format(FormatError::ShortMagic { .. } | FormatError::TruncatedDescriptor) => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            ReadError::Allocation { .. } => io::Error::new(io::ErrorKind::OutOfMemory, err),
            ReadError::InvalidConfig { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_magic_message_shows_hex() {
        let err = ReadError::from(FormatError::BadMagic { found: 0xDEAD_BEEF });
        assert_eq!(
            err.to_string(),
            "invalid stream header: unrecognized header: magic 0xDEADBEEF, expected 0x184D2204"
        );
    }

    #[test]
    fn io_error_passes_through() {
        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        let converted = io::Error::from(ReadError::Io(inner));
        assert_eq!(converted.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn truncation_maps_to_unexpected_eof() {
        let converted = io::Error::from(ReadError::Codec(CodecError::Truncated { needed: 3 }));
        assert_eq!(converted.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn corrupt_data_maps_to_invalid_data() {
        let converted = io::Error::from(ReadError::Codec(CodecError::CorruptBlock("x".into())));
        assert_eq!(converted.kind(), io::ErrorKind::InvalidData);
        let converted = io::Error::from(ReadError::Failed);
        assert_eq!(converted.kind(), io::ErrorKind::InvalidData);
    }
}
