use crate::compressed::alloc_zeroed;
use crate::error::ReadError;

/// Fixed-capacity buffer of decoded bytes awaiting delivery.
///
/// Holds the most recent decode batch; `cursor` marks how much of it the
/// caller has already taken. A new batch is only started once the previous
/// one has been fully handed out.
pub struct DecodedBuffer {
    buf: Vec<u8>,
    len: usize,
    cursor: usize,
}

impl DecodedBuffer {
    /// # Errors
    ///
    /// [`ReadError::Allocation`] if the buffer cannot be reserved.
    pub fn with_capacity(capacity: usize) -> Result<Self, ReadError> {
        Ok(Self {
            buf: alloc_zeroed(capacity)?,
            len: 0,
            cursor: 0,
        })
    }

    /// Bytes decoded but not yet copied out.
    #[must_use]
    pub fn available(&self) -> usize {
        self.len - self.cursor
    }

    /// Length of the current batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    /// Start a new batch.
    pub fn reset(&mut self) {
        self.len = 0;
        self.cursor = 0;
    }

    /// Unwritten tail of the current batch.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Record `n` bytes written into [`spare_mut`](Self::spare_mut).
    pub fn commit(&mut self, n: usize) {
        debug_assert!(self.len + n <= self.buf.len());
        self.len = (self.len + n).min(self.buf.len());
    }

    /// Copy `min(available, dst.len())` bytes into `dst`.
    pub fn copy_out(&mut self, dst: &mut [u8]) -> usize {
        let n = self.available().min(dst.len());
        dst[..n].copy_from_slice(&self.buf[self.cursor..self.cursor + n]);
        self.cursor += n;
        n
    }

    /// Drop the storage. The buffer is unusable afterwards.
    pub fn release(&mut self) {
        self.buf = Vec::new();
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_delivered_in_caller_sized_pieces() {
        let mut buf = DecodedBuffer::with_capacity(8).unwrap();
        buf.spare_mut()[..5].copy_from_slice(b"hello");
        buf.commit(5);
        assert_eq!(buf.available(), 5);

        let mut out = [0u8; 2];
        assert_eq!(buf.copy_out(&mut out), 2);
        assert_eq!(&out, b"he");
        let mut out = [0u8; 10];
        assert_eq!(buf.copy_out(&mut out), 3);
        assert_eq!(&out[..3], b"llo");
        assert_eq!(buf.copy_out(&mut out), 0);
    }

    #[test]
    fn commits_accumulate_until_full() {
        let mut buf = DecodedBuffer::with_capacity(4).unwrap();
        buf.spare_mut()[..3].copy_from_slice(b"abc");
        buf.commit(3);
        assert!(!buf.is_full());
        assert_eq!(buf.spare_mut().len(), 1);
        buf.spare_mut()[0] = b'd';
        buf.commit(1);
        assert!(buf.is_full());
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn reset_starts_empty_batch() {
        let mut buf = DecodedBuffer::with_capacity(4).unwrap();
        buf.commit(4);
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.available(), 0);
        assert_eq!(buf.spare_mut().len(), 4);
    }
}
