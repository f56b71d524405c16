#![warn(clippy::pedantic)]

pub mod compressed;
pub mod config;
pub mod decompressed;
pub mod error;
pub mod header;
pub mod reader;

pub use config::{DEFAULT_BUFFER_SIZE, FrameMode, ReaderConfig};
pub use error::{FormatError, ReadError};
pub use reader::{Lz4Reader, StreamState, StreamStats, open};

pub use lz4s_frame::{BlockMode, BlockSize, CodecError, FrameInfo};
