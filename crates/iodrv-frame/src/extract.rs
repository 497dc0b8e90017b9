use crate::detector::{FrameDetector, Scan};
use crate::error::{FrameError, Result};

/// Outcome of one extraction pass over a buffer view.
///
/// Offsets are relative to the start of the view. The caller commits the
/// result: skipped bytes are garbage to drop and count, frame bytes are the
/// packet to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// No complete frame. The first `skipped` bytes are garbage; whatever
    /// follows is an undetermined prefix worth keeping for more input.
    None { skipped: usize },
    /// A complete frame of `len` bytes starts at offset `skipped`; everything
    /// before it is garbage.
    Frame { skipped: usize, len: usize },
}

/// Walk `detector` across `view`, skipping garbage until it either finds a
/// complete frame or runs out of classified bytes.
///
/// Returns [`FrameError::DetectorContract`] when the detector claims bytes
/// beyond the window it was shown (or claims zero), which would otherwise
/// corrupt the buffer accounting.
pub fn scan_buffer<D: FrameDetector>(detector: &D, view: &[u8]) -> Result<Extraction> {
    let mut skipped = 0;
    while skipped < view.len() {
        let window = &view[skipped..];
        match detector.scan(window) {
            Scan::NeedMore => return Ok(Extraction::None { skipped }),
            Scan::Frame(len) => {
                if len == 0 || len > window.len() {
                    return Err(FrameError::DetectorContract {
                        claimed: len,
                        available: window.len(),
                    });
                }
                return Ok(Extraction::Frame { skipped, len });
            }
            Scan::Junk(len) => {
                if len == 0 || len > window.len() {
                    return Err(FrameError::DetectorContract {
                        claimed: len,
                        available: window.len(),
                    });
                }
                skipped += len;
            }
        }
    }
    Ok(Extraction::None { skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Frames look like { 0, _, _, 0 }; anything not starting with 0 is junk.
    fn detector(window: &[u8]) -> Scan {
        if window.is_empty() {
            Scan::NeedMore
        } else if window[0] != 0 {
            Scan::Junk(1)
        } else if window.len() < 4 {
            Scan::NeedMore
        } else if window[3] == 0 {
            Scan::Frame(4)
        } else {
            Scan::Junk(4)
        }
    }

    fn d() -> fn(&[u8]) -> Scan {
        detector
    }

    #[test]
    fn empty_view_is_undetermined() {
        assert_eq!(scan_buffer(&d(), b"").unwrap(), Extraction::None { skipped: 0 });
    }

    #[test]
    fn frame_at_front() {
        let view = [0, b'a', b'b', 0];
        assert_eq!(
            scan_buffer(&d(), &view).unwrap(),
            Extraction::Frame { skipped: 0, len: 4 }
        );
    }

    #[test]
    fn frame_after_garbage() {
        let view = [b'g', b'a', b'r', b'b', 0, b'a', b'b', 0];
        assert_eq!(
            scan_buffer(&d(), &view).unwrap(),
            Extraction::Frame { skipped: 4, len: 4 }
        );
    }

    #[test]
    fn garbage_to_the_end() {
        let view = [b'x', b'y', b'z'];
        assert_eq!(scan_buffer(&d(), &view).unwrap(), Extraction::None { skipped: 3 });
    }

    #[test]
    fn undetermined_tail_after_garbage() {
        // Two junk bytes, then a frame start with too few bytes to decide.
        let view = [b'x', b'y', 0, b'a'];
        assert_eq!(scan_buffer(&d(), &view).unwrap(), Extraction::None { skipped: 2 });
    }

    #[test]
    fn false_start_skipped_as_a_block() {
        // Starts like a frame but byte 3 is not the terminator.
        let view = [0, b'a', b'b', b'c', 0, b'd', b'e', 0];
        assert_eq!(
            scan_buffer(&d(), &view).unwrap(),
            Extraction::Frame { skipped: 4, len: 4 }
        );
    }

    #[test]
    fn junk_beyond_window_is_a_contract_error() {
        let lying = |window: &[u8]| Scan::Junk(window.len() + 1);
        let err = scan_buffer(&lying, b"abc").unwrap_err();
        assert!(matches!(
            err,
            FrameError::DetectorContract {
                claimed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn zero_length_frame_is_a_contract_error() {
        let lying = |_: &[u8]| Scan::Frame(0);
        let err = scan_buffer(&lying, b"abc").unwrap_err();
        assert!(matches!(err, FrameError::DetectorContract { claimed: 0, .. }));
    }

    #[test]
    fn frame_beyond_window_is_a_contract_error() {
        let lying = |window: &[u8]| Scan::Frame(window.len() + 7);
        assert!(scan_buffer(&lying, b"ab").is_err());
    }
}
