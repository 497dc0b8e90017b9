use std::os::unix::io::RawFd;

use crate::guard::FdGuard;

/// The active byte source of a driver. Exactly one variant is live at a time.
///
/// `Pushed` has no descriptor: bytes arrive through `Driver::push_raw`, and a
/// failed extraction cannot be waited out because nothing refills the buffer
/// from inside the read loop.
#[derive(Debug)]
pub(crate) enum Source {
    /// Bytes are pushed directly into the input buffer by the caller.
    Pushed,
    /// Bytes are drained from a non-blocking descriptor.
    Handle(FdGuard),
}

impl Source {
    pub(crate) fn fd(&self) -> Option<RawFd> {
        match self {
            Source::Pushed => None,
            Source::Handle(guard) => Some(guard.fd()),
        }
    }
}
