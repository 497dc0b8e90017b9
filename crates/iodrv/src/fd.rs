//! Non-blocking descriptor plumbing.
//!
//! Thin wrappers over `fcntl`/`read`/`write`/`poll`. Errno is read here, at
//! the transport boundary, and translated to `io::Error` immediately.

use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Result of a non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// `n` bytes were placed at the front of the destination.
    Data(usize),
    /// The descriptor has no bytes ready.
    WouldBlock,
    /// The peer closed the stream.
    Eof,
}

/// Verdict of a bounded readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready,
    TimedOut,
}

/// Switch the descriptor to non-blocking mode, preserving its other flags.
pub(crate) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: F_GETFL takes no argument and reads no memory; `fd` is a
    // descriptor the caller handed us.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if flags & libc::O_NONBLOCK != 0 {
        return Ok(());
    }
    // SAFETY: F_SETFL with an integer flag argument reads no memory.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Read whatever is ready, without blocking. Retries on `EINTR`.
pub(crate) fn read_available(fd: RawFd, dst: &mut [u8]) -> io::Result<ReadOutcome> {
    loop {
        // SAFETY: `dst` is a valid writable region of `dst.len()` bytes for
        // the duration of the call.
        let rc = unsafe { libc::read(fd, dst.as_mut_ptr().cast(), dst.len()) };
        if rc > 0 {
            return Ok(ReadOutcome::Data(rc as usize));
        }
        if rc == 0 {
            return Ok(ReadOutcome::Eof);
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::Interrupted => continue,
            io::ErrorKind::WouldBlock => return Ok(ReadOutcome::WouldBlock),
            _ => return Err(err),
        }
    }
}

/// Write as much as the descriptor accepts, without blocking.
/// `Ok(None)` means the descriptor is not ready for writing.
pub(crate) fn write_some(fd: RawFd, src: &[u8]) -> io::Result<Option<usize>> {
    loop {
        // SAFETY: `src` is a valid readable region of `src.len()` bytes for
        // the duration of the call.
        let rc = unsafe { libc::write(fd, src.as_ptr().cast(), src.len()) };
        if rc >= 0 {
            return Ok(Some(rc as usize));
        }
        let err = io::Error::last_os_error();
        match err.kind() {
            io::ErrorKind::Interrupted => continue,
            io::ErrorKind::WouldBlock => return Ok(None),
            _ => return Err(err),
        }
    }
}

/// Wait until the descriptor is readable or the wait elapses.
pub(crate) fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<Readiness> {
    wait(fd, libc::POLLIN, timeout)
}

/// Wait until the descriptor is writable or the wait elapses.
pub(crate) fn wait_writable(fd: RawFd, timeout: Duration) -> io::Result<Readiness> {
    wait(fd, libc::POLLOUT, timeout)
}

fn wait(fd: RawFd, events: libc::c_short, timeout: Duration) -> io::Result<Readiness> {
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    // SAFETY: `pfd` is a valid pollfd array of length 1 for the duration of
    // the call.
    let rc = unsafe { libc::poll(&mut pfd, 1, poll_millis(timeout)) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            // The caller re-checks its deadline and re-enters the wait.
            return Ok(Readiness::TimedOut);
        }
        return Err(err);
    }
    if rc == 0 {
        return Ok(Readiness::TimedOut);
    }
    Ok(Readiness::Ready)
}

/// Round up to whole milliseconds so a nonzero wait never degenerates into a
/// busy spin on a zero-timeout poll.
fn poll_millis(timeout: Duration) -> libc::c_int {
    if timeout.is_zero() {
        return 0;
    }
    let ms = timeout.as_nanos().div_ceil(1_000_000);
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0 as RawFd; 2];
        // SAFETY: `fds` is a valid array of two ints.
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0);
        (fds[0], fds[1])
    }

    fn close(fd: RawFd) {
        // SAFETY: closing a descriptor this test opened.
        unsafe { libc::close(fd) };
    }

    fn write_all(fd: RawFd, data: &[u8]) {
        // SAFETY: `data` is a valid readable region.
        let rc = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
        assert_eq!(rc as usize, data.len());
    }

    #[test]
    fn set_nonblocking_sets_the_flag() {
        let (rx, tx) = pipe();
        set_nonblocking(rx).unwrap();
        // SAFETY: F_GETFL reads no memory.
        let flags = unsafe { libc::fcntl(rx, libc::F_GETFL) };
        assert!(flags & libc::O_NONBLOCK != 0);

        // Setting it again is a no-op.
        set_nonblocking(rx).unwrap();
        close(rx);
        close(tx);
    }

    #[test]
    fn read_available_reports_would_block() {
        let (rx, tx) = pipe();
        set_nonblocking(rx).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(read_available(rx, &mut buf).unwrap(), ReadOutcome::WouldBlock);
        close(rx);
        close(tx);
    }

    #[test]
    fn read_available_drains_ready_bytes() {
        let (rx, tx) = pipe();
        set_nonblocking(rx).unwrap();
        write_all(tx, b"hello");
        let mut buf = [0u8; 16];
        assert_eq!(read_available(rx, &mut buf).unwrap(), ReadOutcome::Data(5));
        assert_eq!(&buf[..5], b"hello");
        close(rx);
        close(tx);
    }

    #[test]
    fn read_available_reports_eof() {
        let (rx, tx) = pipe();
        set_nonblocking(rx).unwrap();
        close(tx);
        let mut buf = [0u8; 16];
        assert_eq!(read_available(rx, &mut buf).unwrap(), ReadOutcome::Eof);
        close(rx);
    }

    #[test]
    fn wait_readable_times_out_on_silence() {
        let (rx, tx) = pipe();
        let verdict = wait_readable(rx, Duration::from_millis(10)).unwrap();
        assert_eq!(verdict, Readiness::TimedOut);
        close(rx);
        close(tx);
    }

    #[test]
    fn wait_readable_wakes_on_data() {
        let (rx, tx) = pipe();
        write_all(tx, b"x");
        let verdict = wait_readable(rx, Duration::from_millis(100)).unwrap();
        assert_eq!(verdict, Readiness::Ready);
        close(rx);
        close(tx);
    }

    #[test]
    fn poll_millis_rounds_up() {
        assert_eq!(poll_millis(Duration::ZERO), 0);
        assert_eq!(poll_millis(Duration::from_micros(1)), 1);
        assert_eq!(poll_millis(Duration::from_millis(10)), 10);
        assert_eq!(poll_millis(Duration::from_micros(10_500)), 11);
    }
}
