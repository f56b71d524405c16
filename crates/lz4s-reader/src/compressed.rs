use std::io::{self, Read};

use crate::error::ReadError;

/// Reserve exactly `len` zeroed bytes, reporting failure instead of aborting.
pub(crate) fn alloc_zeroed(len: usize) -> Result<Vec<u8>, ReadError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ReadError::Allocation { requested: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Fixed-capacity buffer of compressed bytes read from the source.
///
/// ```text
///   0          cursor            filled        capacity
///   ├──consumed──┼──unconsumed──────┼──────────────┤
/// ```
///
/// The buffer is only refilled once `cursor == filled`.
pub struct CompressedBuffer {
    buf: Vec<u8>,
    filled: usize,
    cursor: usize,
    source_drained: bool,
    total_read: u64,
}

impl CompressedBuffer {
    /// # Errors
    ///
    /// [`ReadError::Allocation`] if the buffer cannot be reserved.
    pub fn with_capacity(capacity: usize) -> Result<Self, ReadError> {
        Ok(Self {
            buf: alloc_zeroed(capacity)?,
            filled: 0,
            cursor: 0,
            source_drained: false,
            total_read: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from the source but not yet handed to the engine.
    #[must_use]
    pub fn unconsumed(&self) -> &[u8] {
        &self.buf[self.cursor..self.filled]
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.filled
    }

    /// The source has returned end-of-file.
    #[must_use]
    pub fn source_drained(&self) -> bool {
        self.source_drained
    }

    /// Total bytes pulled from the source.
    #[must_use]
    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    /// Advance the cursor past `n` bytes the engine consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.filled - self.cursor);
        self.cursor = (self.cursor + n).min(self.filled);
    }

    /// Replace the buffer contents with one read from `source`.
    ///
    /// Returns the number of bytes read; `0` means the source is drained.
    /// A short read is not an error.
    ///
    /// # Errors
    ///
    /// [`ReadError::Io`] if the source fails. `Interrupted` is retried.
    pub fn refill<R: Read>(&mut self, source: &mut R) -> Result<usize, ReadError> {
        debug_assert!(self.is_exhausted());
        self.cursor = 0;
        self.filled = 0;
        let n = read_retrying(source, &mut self.buf)?;
        self.filled = n;
        self.total_read += n as u64;
        if n == 0 {
            self.source_drained = true;
        }
        Ok(n)
    }

    /// Accumulate reads until at least `min` bytes are unconsumed or the
    /// source ends. Returns the unconsumed length.
    ///
    /// # Errors
    ///
    /// [`ReadError::Io`] if the source fails.
    pub fn fill_at_least<R: Read>(&mut self, source: &mut R, min: usize) -> Result<usize, ReadError> {
        let min = min.min(self.capacity());
        if self.cursor > 0 {
            self.buf.copy_within(self.cursor..self.filled, 0);
            self.filled -= self.cursor;
            self.cursor = 0;
        }
        while self.filled < min && !self.source_drained {
            let n = read_retrying(source, &mut self.buf[self.filled..])?;
            self.filled += n;
            self.total_read += n as u64;
            if n == 0 {
                self.source_drained = true;
            }
        }
        Ok(self.filled)
    }

    /// Drop the storage. The buffer is unusable afterwards.
    pub fn release(&mut self) {
        self.buf = Vec::new();
        self.filled = 0;
        self.cursor = 0;
    }
}

fn read_retrying<R: Read>(source: &mut R, dst: &mut [u8]) -> Result<usize, ReadError> {
    loop {
        match source.read(dst) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ReadError::Io(e)),
        }
    }
}
