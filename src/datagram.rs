//! A single EtherCAT datagram: one read or write embedded in a frame.

use crate::command::Command;
use atomic_enum::atomic_enum;
use core::time::Duration;

/// Maximum datagram payload. Leaves room for several datagrams in one Ethernet frame.
pub const MAX_PAYLOAD: usize = 1486;

/// Lifecycle state of a [`Datagram`].
///
/// Ladder: `Invalid -> Init -> Queued -> Sent -> (Received | TimedOut | Errored)`.
#[atomic_enum]
#[derive(PartialEq, Eq)]
pub enum DatagramState {
    /// Not yet initialised; not eligible for queueing.
    Invalid = 0,
    /// Initialised with a command and payload, not yet queued.
    Init,
    /// On the pending queue, waiting for the next send.
    Queued,
    /// Packed into a frame and handed to the link device; holds an index reservation.
    Sent,
    /// A matching reply was demultiplexed into this datagram.
    Received,
    /// The engine observed a structural problem processing this datagram's reply.
    Errored,
    /// No reply arrived before the engine's timeout elapsed.
    TimedOut,
}

/// Monotonic microsecond timestamps recorded as a datagram moves through the engine.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DatagramTimestamps {
    /// When `queue()` accepted this datagram.
    pub queued_at: Option<Duration>,
    /// When the containing frame was hand off to the link device.
    pub sent_at: Option<Duration>,
    /// When a reply (or timeout sweep) resolved this datagram.
    pub resolved_at: Option<Duration>,
}

/// A single EtherCAT datagram.
///
/// Owns a fixed-capacity payload buffer; the buffer holds the request payload until sent, and is
/// overwritten in place with reply data on receive. Datagrams are never allocated on the RT path;
/// they live inside [`crate::slave::Slave`],
/// [`crate::ring::ExternalRing`], or [`crate::domain::Domain`], and are only ever *borrowed* onto
/// the queue.
pub struct Datagram {
    pub command: Command,
    pub index: u8,
    pub link: u8,
    pub state: AtomicDatagramState,
    pub working_counter: u16,
    pub timestamps: DatagramTimestamps,
    payload: [u8; MAX_PAYLOAD],
    payload_len: usize,
}

impl Datagram {
    /// Construct a new, `Invalid`-state datagram with no payload.
    pub const fn new() -> Self {
        Self {
            command: Command::Nop,
            index: 0,
            link: 0,
            state: AtomicDatagramState::new(DatagramState::Invalid),
            working_counter: 0,
            timestamps: DatagramTimestamps {
                queued_at: None,
                sent_at: None,
                resolved_at: None,
            },
            payload: [0u8; MAX_PAYLOAD],
            payload_len: 0,
        }
    }

    /// Re-initialise this datagram for a new command and payload, moving it to `Init`.
    ///
    /// This never allocates: it copies `payload` into the fixed-size internal buffer. Payloads
    /// longer than [`MAX_PAYLOAD`] are truncated; callers are responsible for sizing requests
    /// within that bound.
    pub fn init(&mut self, link: u8, command: Command, payload: &[u8]) {
        self.command = command;
        self.link = link;
        self.working_counter = 0;
        let n = payload.len().min(MAX_PAYLOAD);
        self.payload[..n].copy_from_slice(&payload[..n]);
        self.payload_len = n;
        self.timestamps = DatagramTimestamps::default();
        self.state.store(DatagramState::Init, Ordering::Release);
    }

    /// Payload bytes, sized to what was passed to [`Datagram::init`] (or overwritten by a reply).
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }

    /// Mutable payload bytes, used by the receive path to copy reply data in place.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload[..self.payload_len]
    }

    /// Grow or shrink the logical payload length (e.g. to accept a shorter mailbox reply).
    pub fn set_payload_len(&mut self, len: usize) {
        debug_assert!(len <= MAX_PAYLOAD);
        self.payload_len = len.min(MAX_PAYLOAD);
    }

    pub fn state(&self) -> DatagramState {
        self.state.load(Ordering::Acquire)
    }

    pub fn set_state(&mut self, state: DatagramState) {
        self.state.store(state, Ordering::Release);
    }
}

impl Default for Datagram {
    fn default() -> Self {
        Self::new()
    }
}

use core::sync::atomic::Ordering;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_moves_to_init_state() {
        let mut dg = Datagram::new();
        assert_eq!(dg.state(), DatagramState::Invalid);

        dg.init(0, Command::fprd(0x1001, 0x0130), &[0xaa, 0xbb]);

        assert_eq!(dg.state(), DatagramState::Init);
        assert_eq!(dg.payload(), &[0xaa, 0xbb]);
    }

    #[test]
    fn reply_can_shrink_payload() {
        let mut dg = Datagram::new();
        dg.init(0, Command::fprd(0x1001, 0x0130), &[0u8; 8]);

        dg.payload_mut()[..4].copy_from_slice(&[1, 2, 3, 4]);
        dg.set_payload_len(4);

        assert_eq!(dg.payload(), &[1, 2, 3, 4]);
    }
}
