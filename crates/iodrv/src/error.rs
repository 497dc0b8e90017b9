/// Which deadline expired during a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// No byte was delivered during the call and nothing is buffered.
    FirstByte,
    /// Bytes are pending but no complete frame arrived in time. The partial
    /// bytes stay in the input buffer so the next call can finish the frame.
    Packet,
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutKind::FirstByte => f.write_str("first byte"),
            TimeoutKind::Packet => f.write_str("packet"),
        }
    }
}

/// Errors surfaced by driver read/write operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A read deadline expired before a complete frame was available.
    #[error("read timed out waiting for {kind}")]
    Timeout { kind: TimeoutKind },

    /// The write deadline expired before the whole packet was flushed.
    /// Bytes already written stay counted in `tx`.
    #[error("write timed out")]
    WriteTimeout,

    /// `push_raw` would exceed the internal buffer capacity.
    #[error("input buffer full ({len} of {capacity} bytes used, {additional} more pushed)")]
    BufferFull {
        len: usize,
        additional: usize,
        capacity: usize,
    },

    /// The extracted packet does not fit in the caller's output buffer.
    /// The packet has been consumed and its bytes counted in `good_rx`.
    #[error("packet of {packet} bytes exceeds the {available}-byte output buffer")]
    BufferTooSmall { packet: usize, available: usize },

    /// The byte source reported end-of-stream. Terminal for this source.
    #[error("end of stream")]
    Eof,

    /// Transport-level I/O failure.
    #[error("driver I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The frame detector claimed bytes it was never shown, or claimed zero.
    /// Fatal for the call; the driver and its buffer stay usable.
    #[error("frame detector claimed {claimed} bytes out of {available} available")]
    DetectorContract { claimed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, DriverError>;
