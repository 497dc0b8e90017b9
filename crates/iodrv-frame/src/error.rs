/// Errors from the packet-extraction core.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Appending would exceed the buffer's fixed capacity.
    #[error("input buffer full ({len} of {capacity} bytes used, {additional} more requested)")]
    BufferFull {
        len: usize,
        additional: usize,
        capacity: usize,
    },

    /// The frame detector claimed more bytes than it was shown, or zero.
    #[error("frame detector claimed {claimed} bytes out of {available} available")]
    DetectorContract { claimed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
