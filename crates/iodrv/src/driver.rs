use std::io;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

use iodrv_frame::{scan_buffer, Extraction, FrameDetector, FrameError, InputBuffer};
use tracing::{debug, trace};

use crate::error::{DriverError, Result, TimeoutKind};
use crate::fd::{self, ReadOutcome, Readiness};
use crate::guard::FdGuard;
use crate::source::Source;
use crate::stats::Stats;

/// How many bytes one read syscall pulls off the descriptor.
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Input-buffer capacity used when none is given.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Driver construction parameters.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Capacity of the internal input buffer.
    pub buffer_capacity: usize,
    /// Start in newest-packet extraction mode instead of earliest-packet.
    pub extract_last_packet: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            extract_last_packet: false,
        }
    }
}

/// Packet-oriented driver over a byte-stream transport.
///
/// Couples a capacity-bounded input buffer to a frame detector `D` and a
/// deadline-driven read loop. Bytes come either from a non-blocking file
/// descriptor ([`set_file_descriptor`](Self::set_file_descriptor)) or from
/// directly pushed buffers ([`push_raw`](Self::push_raw)); extraction and
/// accounting behave identically in both modes.
///
/// A driver instance is single-threaded: callers serialize access. The only
/// blocking points are the readiness waits inside
/// [`read_packet`](Self::read_packet) and
/// [`write_packet`](Self::write_packet).
pub struct Driver<D> {
    detector: D,
    buf: InputBuffer,
    source: Source,
    extract_last: bool,
    stats: Stats,
}

impl<D: FrameDetector> Driver<D> {
    /// Create a driver with the given detector and input-buffer capacity.
    ///
    /// The capacity bounds how much unparsed input the driver retains; it
    /// must be at least the size of the largest expected packet, or complete
    /// frames will never fit.
    pub fn new(detector: D, internal_buffer_size: usize) -> Self {
        Self::with_config(
            detector,
            DriverConfig {
                buffer_capacity: internal_buffer_size,
                ..DriverConfig::default()
            },
        )
    }

    /// Create a driver with explicit configuration.
    pub fn with_config(detector: D, config: DriverConfig) -> Self {
        Self {
            detector,
            buf: InputBuffer::with_capacity(config.buffer_capacity),
            source: Source::Pushed,
            extract_last: config.extract_last_packet,
            stats: Stats::default(),
        }
    }

    /// Install a file descriptor as the byte source.
    ///
    /// The descriptor is switched to non-blocking mode. When `owned` is true
    /// the driver closes it when the source is replaced or the driver drops;
    /// otherwise the caller keeps the close responsibility. Any previously
    /// owned descriptor is closed by the swap.
    pub fn set_file_descriptor(&mut self, fd: RawFd, owned: bool) -> Result<()> {
        fd::set_nonblocking(fd)?;
        debug!(fd, owned, "installing descriptor source");
        self.source = Source::Handle(FdGuard::new(fd, owned));
        Ok(())
    }

    /// Drop the current source, closing the descriptor if owned.
    /// The driver falls back to pushed mode.
    pub fn clear_source(&mut self) {
        if self.is_valid() {
            debug!("clearing descriptor source");
        }
        self.source = Source::Pushed;
    }

    /// True when a descriptor source is active.
    pub fn is_valid(&self) -> bool {
        matches!(self.source, Source::Handle(_))
    }

    /// The active descriptor, if any.
    pub fn file_descriptor(&self) -> Option<RawFd> {
        self.source.fd()
    }

    /// Append bytes directly to the input buffer.
    ///
    /// This is how a pushed-mode driver is fed; it also works alongside a
    /// descriptor source (for injecting test traffic). Fails with
    /// [`DriverError::BufferFull`] when the bytes do not fit.
    pub fn push_raw(&mut self, data: &[u8]) -> Result<()> {
        self.buf.append(data).map_err(frame_error)
    }

    /// Capacity of the internal input buffer.
    pub fn internal_buffer_size(&self) -> usize {
        self.buf.capacity()
    }

    /// Switch between earliest-packet and newest-packet extraction.
    ///
    /// With newest-packet mode on, a read drains every complete frame the
    /// buffer yields and returns only the most recent one; superseded frames
    /// still count in `good_rx`.
    pub fn set_extract_last_packet(&mut self, enable: bool) {
        self.extract_last = enable;
    }

    /// Current extraction mode.
    pub fn extract_last_packet(&self) -> bool {
        self.extract_last
    }

    /// Snapshot of the driver statistics.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Zero all counters and timestamps.
    pub fn reset_stats(&mut self) {
        self.stats = Stats::default();
    }

    /// Discard all buffered input, counting it as garbage.
    pub fn clear_input_buffer(&mut self) {
        let len = self.buf.len();
        if len > 0 {
            trace!(bytes = len, "flushing input buffer");
            self.stats.bad_rx += len as u64;
            self.buf.clear();
        }
    }

    /// Read one packet with a single overall deadline.
    ///
    /// Equivalent to
    /// [`read_packet_with_first_byte_timeout`](Self::read_packet_with_first_byte_timeout)
    /// with both deadlines equal.
    pub fn read_packet(&mut self, out: &mut [u8], timeout: Duration) -> Result<usize> {
        self.read_packet_with_first_byte_timeout(out, timeout, timeout)
    }

    /// Read one packet, bounding separately how long to wait for the first
    /// byte.
    ///
    /// `first_byte_timeout` guards against a silent peer: it applies only
    /// until the input buffer first holds data within this call, and the
    /// total deadline always dominates. On success the packet is copied into
    /// `out` and its length returned. On
    /// [`Timeout`](DriverError::Timeout)`{ kind: Packet }` any partial frame
    /// stays buffered so the next call can finish it.
    pub fn read_packet_with_first_byte_timeout(
        &mut self,
        out: &mut [u8],
        total_timeout: Duration,
        first_byte_timeout: Duration,
    ) -> Result<usize> {
        let start = Instant::now();
        let total_deadline = start + total_timeout;
        let first_byte_deadline = start + first_byte_timeout.min(total_timeout);
        let mut first_byte_armed = self.buf.is_empty();
        let mut received = false;
        let mut scratch = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(len) = self.take_frame(out)? {
                return Ok(len);
            }
            if !self.buf.is_empty() {
                first_byte_armed = false;
            }

            let fd = match self.source.fd() {
                Some(fd) => fd,
                // Pushed source: the buffer cannot grow inside this call, so
                // waiting would never make progress.
                None => return Err(self.timeout_error(received)),
            };

            let deadline = if first_byte_armed {
                first_byte_deadline
            } else {
                total_deadline
            };
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timeout_error(received));
            }

            if fd::wait_readable(fd, deadline - now)? == Readiness::Ready {
                let (appended, eof) = self.drain_descriptor(fd, &mut scratch)?;
                if appended > 0 {
                    received = true;
                    first_byte_armed = false;
                }
                if eof {
                    // One last look at what already arrived, then report the
                    // closed stream without waiting out the deadline.
                    if let Some(len) = self.take_frame(out)? {
                        return Ok(len);
                    }
                    debug!("descriptor reports end of stream");
                    return Err(DriverError::Eof);
                }
            }
        }
    }

    /// Write a whole packet to the transport within `timeout`.
    ///
    /// The handle variant writes without blocking and waits for writability
    /// between partial writes. Bytes that reach the transport are counted in
    /// `tx` even when the deadline expires midway. The pushed variant has no
    /// transmit side; it accepts and counts the bytes.
    pub fn write_packet(&mut self, data: &[u8], timeout: Duration) -> Result<usize> {
        let fd = match self.source.fd() {
            Some(fd) => fd,
            None => {
                self.stats.tx += data.len() as u64;
                self.stats.last_tx = Some(Instant::now());
                return Ok(data.len());
            }
        };

        let deadline = Instant::now() + timeout;
        let mut written = 0;
        while written < data.len() {
            match fd::write_some(fd, &data[written..])? {
                Some(0) => return Err(DriverError::Io(io::ErrorKind::WriteZero.into())),
                Some(n) => {
                    written += n;
                    self.stats.tx += n as u64;
                    self.stats.last_tx = Some(Instant::now());
                }
                None => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(DriverError::WriteTimeout);
                    }
                    fd::wait_writable(fd, deadline - now)?;
                }
            }
        }
        Ok(written)
    }

    // One committed extraction attempt over the current buffer contents.
    // Returns the length of the packet copied into `out`, if any.
    fn take_frame(&mut self, out: &mut [u8]) -> Result<Option<usize>> {
        if self.extract_last {
            self.take_newest_frame(out)
        } else {
            self.take_first_frame(out)
        }
    }

    fn take_first_frame(&mut self, out: &mut [u8]) -> Result<Option<usize>> {
        match scan_buffer(&self.detector, self.buf.view()).map_err(frame_error)? {
            Extraction::None { skipped } => {
                self.discard(skipped);
                Ok(None)
            }
            Extraction::Frame { skipped, len } => {
                self.discard(skipped);
                self.stats.good_rx += len as u64;
                self.stats.last_good_rx = Some(Instant::now());
                let fits = len <= out.len();
                if fits {
                    out[..len].copy_from_slice(&self.buf.view()[..len]);
                }
                self.buf.drop_front(len);
                if fits {
                    Ok(Some(len))
                } else {
                    Err(DriverError::BufferTooSmall {
                        packet: len,
                        available: out.len(),
                    })
                }
            }
        }
    }

    // Drain every complete frame the buffer yields, keep the newest in a side
    // slot, and leave only the undetermined tail buffered. Superseded frames
    // count in `good_rx`; their bytes were well-formed.
    fn take_newest_frame(&mut self, out: &mut [u8]) -> Result<Option<usize>> {
        let mut newest: Option<Vec<u8>> = None;
        loop {
            match scan_buffer(&self.detector, self.buf.view()).map_err(frame_error)? {
                Extraction::Frame { skipped, len } => {
                    self.discard(skipped);
                    self.stats.good_rx += len as u64;
                    self.stats.last_good_rx = Some(Instant::now());
                    newest = Some(self.buf.view()[..len].to_vec());
                    self.buf.drop_front(len);
                }
                Extraction::None { skipped } => {
                    self.discard(skipped);
                    break;
                }
            }
        }

        match newest {
            None => Ok(None),
            Some(frame) => {
                if frame.len() > out.len() {
                    return Err(DriverError::BufferTooSmall {
                        packet: frame.len(),
                        available: out.len(),
                    });
                }
                out[..frame.len()].copy_from_slice(&frame);
                Ok(Some(frame.len()))
            }
        }
    }

    // Drop classified garbage off the front, keeping the counters accurate.
    fn discard(&mut self, n: usize) {
        if n > 0 {
            trace!(bytes = n, "discarding garbage");
            self.stats.bad_rx += n as u64;
            self.buf.drop_front(n);
        }
    }

    // Pull everything the descriptor has ready into the input buffer.
    // Returns (bytes appended, end-of-stream seen).
    fn drain_descriptor(&mut self, fd: RawFd, scratch: &mut [u8]) -> Result<(usize, bool)> {
        let mut appended = 0;
        loop {
            match fd::read_available(fd, scratch)? {
                ReadOutcome::WouldBlock => return Ok((appended, false)),
                ReadOutcome::Eof => return Ok((appended, true)),
                ReadOutcome::Data(n) => {
                    self.absorb(&scratch[..n])?;
                    appended += n;
                }
            }
        }
    }

    // Append fresh transport bytes, evicting the oldest buffered bytes when
    // the buffer would overflow. Fresh bytes are the likeliest start of a
    // valid frame; evicted and truncated bytes count as garbage.
    fn absorb(&mut self, mut data: &[u8]) -> Result<()> {
        let capacity = self.buf.capacity();
        if data.len() > capacity {
            let excess = data.len() - capacity;
            trace!(bytes = excess, "input burst exceeds buffer capacity");
            self.stats.bad_rx += excess as u64;
            data = &data[excess..];
        }
        let free = capacity - self.buf.len();
        if data.len() > free {
            let evict = data.len() - free;
            trace!(bytes = evict, "evicting oldest buffered bytes");
            self.stats.bad_rx += evict as u64;
            self.buf.drop_front(evict);
        }
        self.buf.append(data).map_err(frame_error)
    }

    fn timeout_error(&self, received: bool) -> DriverError {
        let kind = if !received && self.buf.is_empty() {
            TimeoutKind::FirstByte
        } else {
            TimeoutKind::Packet
        };
        DriverError::Timeout { kind }
    }
}

fn frame_error(err: FrameError) -> DriverError {
    match err {
        FrameError::BufferFull {
            len,
            additional,
            capacity,
        } => DriverError::BufferFull {
            len,
            additional,
            capacity,
        },
        FrameError::DetectorContract { claimed, available } => {
            DriverError::DetectorContract { claimed, available }
        }
    }
}
