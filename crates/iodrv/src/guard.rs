use std::os::unix::io::RawFd;

/// Scoped holder of a raw file descriptor.
///
/// When constructed with `owned`, the guard closes the descriptor exactly
/// once at end of scope, whatever the exit path. [`release`](Self::release)
/// disarms the guard and hands the descriptor back, so moving an fd out never
/// risks a double close. The guard is move-only; there is no way to clone it.
#[derive(Debug)]
pub struct FdGuard {
    fd: RawFd,
    owned: bool,
}

impl FdGuard {
    /// Wrap `fd`. When `owned` is true the guard closes it on drop.
    pub fn new(fd: RawFd, owned: bool) -> Self {
        Self { fd, owned }
    }

    /// The wrapped descriptor.
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// True when the guard will close the descriptor on drop.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Disarm the guard and return the descriptor to the caller, who takes
    /// over the close responsibility.
    pub fn release(mut self) -> RawFd {
        self.owned = false;
        self.fd
    }
}

impl Drop for FdGuard {
    fn drop(&mut self) {
        if self.owned && self.fd >= 0 {
            // SAFETY: the guard exclusively owns `fd`, and this runs at most
            // once — drop is the only close site and `release` disarms it.
            unsafe { libc::close(self.fd) };
            self.fd = -1;
        }
    }
}
