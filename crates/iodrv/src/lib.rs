//! Packet-oriented driver core for byte-stream transports.
//!
//! Serial lines, pipes, and sockets deliver bytes; applications want packets.
//! [`Driver`] bridges the two: it owns a capacity-bounded input buffer, a
//! user-supplied frame detector, and a read loop that multiplexes an overall
//! deadline with a first-byte deadline, skips garbage with byte-accurate
//! accounting, and hands back whole packets.
//!
//! The byte source is either a non-blocking file descriptor
//! ([`Driver::set_file_descriptor`]) or directly pushed buffers
//! ([`Driver::push_raw`]) — the latter makes the driver fully testable
//! without any transport. Extraction behaves identically in both modes.
//!
//! Unix only: the handle-backed source is built on `poll(2)` and raw
//! descriptors.
//!
//! ```
//! use std::time::Duration;
//! use iodrv::{Driver, Scan};
//!
//! // A line-oriented wire: frames end at '\n'.
//! let detector = |window: &[u8]| match window.iter().position(|&b| b == b'\n') {
//!     Some(end) => Scan::Frame(end + 1),
//!     None => Scan::NeedMore,
//! };
//!
//! let mut driver = Driver::new(detector, 256);
//! driver.push_raw(b"ping\npong\n")?;
//!
//! let mut packet = [0u8; 64];
//! let len = driver.read_packet(&mut packet, Duration::from_millis(10))?;
//! assert_eq!(&packet[..len], b"ping\n");
//! # Ok::<(), iodrv::DriverError>(())
//! ```

pub mod driver;
pub mod error;
pub mod guard;
pub mod stats;

mod fd;
mod source;

pub use driver::{Driver, DriverConfig, DEFAULT_BUFFER_CAPACITY};
pub use error::{DriverError, Result, TimeoutKind};
pub use guard::FdGuard;
pub use stats::Stats;

// The extraction core, re-exported so most callers depend on one crate.
pub use iodrv_frame::{framers, FrameDetector, FrameError, InputBuffer, Scan};
