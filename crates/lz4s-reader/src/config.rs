use log::LevelFilter;

use crate::error::ReadError;

/// Default capacity of both stream buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// The compressed buffer must hold at least the magic number.
pub const MIN_COMPRESSED_CAPACITY: usize = 4;

/// How the reader treats data after the first frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameMode {
    /// Keep decoding LZ4 and skippable frames until the source is drained.
    #[default]
    Concatenated,
    /// Stop at the end mark of the first frame; trailing bytes are ignored.
    Single,
}

/// Settings for [`Lz4Reader`](crate::Lz4Reader).
///
/// ```rust
/// use lz4s_reader::{FrameMode, ReaderConfig};
///
/// let config = ReaderConfig {
///     compressed_capacity: 16 * 1024,
///     frame_mode: FrameMode::Single,
///     ..ReaderConfig::default()
/// }
/// .with_display_level(3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Bytes read from the source per refill.
    pub compressed_capacity: usize,
    /// Bytes decoded ahead of the caller.
    pub decompressed_capacity: usize,
    pub verify_checksums: bool,
    pub frame_mode: FrameMode,
    /// Records above this level are not emitted by the reader.
    pub verbosity: LevelFilter,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            compressed_capacity: DEFAULT_BUFFER_SIZE,
            decompressed_capacity: DEFAULT_BUFFER_SIZE,
            verify_checksums: true,
            frame_mode: FrameMode::Concatenated,
            verbosity: LevelFilter::Warn,
        }
    }
}

impl ReaderConfig {
    /// Set `verbosity` from a numeric display level.
    ///
    /// ```text
    ///   0 silent   1 errors   2 warnings   3 progress   4+ information
    /// ```
    ///
    /// Progress is frame metadata (`debug`); information adds every refill
    /// and frame boundary (`trace`).
    #[must_use]
    pub fn with_display_level(mut self, level: u8) -> Self {
        self.verbosity = match level {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        self
    }

    /// # Errors
    ///
    /// [`ReadError::InvalidConfig`] if a buffer capacity is below its minimum.
    pub fn validate(&self) -> Result<(), ReadError> {
        if self.compressed_capacity < MIN_COMPRESSED_CAPACITY {
            return Err(ReadError::InvalidConfig {
                reason: format!(
                    "compressed_capacity must be at least {MIN_COMPRESSED_CAPACITY}, got {}",
                    self.compressed_capacity
                ),
            });
        }
        if self.decompressed_capacity == 0 {
            return Err(ReadError::InvalidConfig {
                reason: "decompressed_capacity must be non-zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ReaderConfig::default();
        assert_eq!(config.compressed_capacity, 65_536);
        assert_eq!(config.decompressed_capacity, 65_536);
        assert_eq!(config.frame_mode, FrameMode::Concatenated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn display_levels_map_to_filters() {
        let levels: Vec<_> = (0..=5)
            .map(|l| ReaderConfig::default().with_display_level(l).verbosity)
            .collect();
        assert_eq!(
            levels,
            [
                LevelFilter::Off,
                LevelFilter::Error,
                LevelFilter::Warn,
                LevelFilter::Debug,
                LevelFilter::Trace,
                LevelFilter::Trace,
            ]
        );
    }

    #[test]
    fn tiny_compressed_buffer_rejected() {
        let config = ReaderConfig {
            compressed_capacity: 3,
            ..ReaderConfig::default()
        };
        assert!(matches!(config.validate(), Err(ReadError::InvalidConfig { .. })));
    }

    #[test]
    fn one_byte_buffers_allowed() {
        let config = ReaderConfig {
            compressed_capacity: 4,
            decompressed_capacity: 1,
            ..ReaderConfig::default()
        };
        assert!(config.validate().is_ok());

        let zero = ReaderConfig {
            decompressed_capacity: 0,
            ..config
        };
        assert!(zero.validate().is_err());
    }
}
