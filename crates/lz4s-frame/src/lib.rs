#![warn(clippy::pedantic)]

pub mod block;
pub mod codec;
pub mod decoder;
pub mod descriptor;
pub mod error;
mod window;

pub use codec::{DecodeStep, FrameCodec};
pub use decoder::{DecoderOptions, FrameDecoder};
pub use descriptor::{BlockMode, BlockSize, FrameInfo, LZ4_MAGIC, MAGIC_SIZE};
pub use error::CodecError;
pub use window::WINDOW_SIZE;
