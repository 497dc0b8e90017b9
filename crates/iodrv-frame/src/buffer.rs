use bytes::{Buf, BytesMut};

use crate::error::{FrameError, Result};

/// Fixed-capacity accumulator for unread transport bytes.
///
/// Grows at the tail, shrinks at the front, and always exposes its contents
/// as a single contiguous slice — the shape a frame detector needs to scan.
#[derive(Debug)]
pub struct InputBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl InputBuffer {
    /// Create an empty buffer that will hold at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Append bytes at the tail.
    ///
    /// Fails with [`FrameError::BufferFull`] when the result would exceed the
    /// capacity; the buffer is left untouched in that case.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if self.buf.len() + data.len() > self.capacity {
            return Err(FrameError::BufferFull {
                len: self.buf.len(),
                additional: data.len(),
                capacity: self.capacity,
            });
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Discard the first `n` bytes. `n` must not exceed [`len`](Self::len).
    pub fn drop_front(&mut self, n: usize) {
        debug_assert!(n <= self.buf.len());
        self.buf.advance(n.min(self.buf.len()));
    }

    /// The buffered bytes as one contiguous slice.
    pub fn view(&self) -> &[u8] {
        &self.buf
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Maximum number of bytes the buffer will hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
