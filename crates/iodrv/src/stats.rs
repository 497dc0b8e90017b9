use std::time::Instant;

/// Byte accounting for one driver instance.
///
/// Counters only ever grow (64-bit, wide enough for the device's life) until
/// an explicit `Driver::reset_stats`. `good_rx` counts bytes of well-formed
/// frames, including frames that were drained but superseded in newest-packet
/// mode; `bad_rx` counts bytes classified as garbage; `tx` counts bytes that
/// reached the transport through the write path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    /// Bytes of well-formed frames.
    pub good_rx: u64,
    /// Bytes discarded as garbage.
    pub bad_rx: u64,
    /// Bytes written to the transport.
    pub tx: u64,
    /// When a frame was last accepted.
    pub last_good_rx: Option<Instant>,
    /// When bytes were last written.
    pub last_tx: Option<Instant>,
}
