//! The boundary between the master core and a concrete network interface.

use crate::error::Error;

/// Counters a link device exposes for diagnostics.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub send_errors: u64,
    pub receive_errors: u64,
}

/// A non-blocking Ethernet link the engine can hand fully-formed frames to, and poll for
/// received frames from.
///
/// Implementations must never block: `transmit` writes whatever the underlying device accepts
/// immediately, and `receive_into` returns `Ok(0)` (or a would-block style error mapped by the
/// implementation) when nothing is waiting. The send/receive path must never suspend.
pub trait LinkDevice {
    /// Send one already-framed Ethernet frame. Returns the number of bytes actually written.
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, Error>;

    /// Poll for one received frame, copying it into `buf`. Returns `Ok(0)` if nothing arrived.
    fn receive_into(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Whether the underlying link currently reports carrier.
    fn link_up(&self) -> bool;

    /// Cumulative counters since the device was opened.
    fn stats(&self) -> LinkStats;
}
