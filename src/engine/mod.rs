//! The datagram engine: queueing, frame packing, index allocation, send, receive, timeout.
//!
//! A synchronous queue drained once per `send()`/`receive()` pair, called from whichever worker
//! currently owns the cyclic exchange
//! (idle worker in `Idle` phase, application RT thread in `Operation` phase, per the phase
//! controller in `phase.rs`).

use crate::command::Command;
use crate::datagram::{Datagram, DatagramState};
use crate::error::Error;
use crate::fmt;
use crate::frame::{pack_frame, FrameReader};
use crate::link::LinkDevice;
use crate::mailbox;
use crate::slave::Slave;
use core::time::Duration;
use spin::Mutex;

/// Maximum number of datagrams considered for one frame. Bounds the per-cycle queue walk.
pub const MAX_DATAGRAMS_PER_FRAME: usize = 32;

/// A raw pointer handle onto a datagram owned elsewhere (a slave's FSM datagram, a domain
/// datagram, or an external ring slot). The queue never owns datagrams, only borrows them for
/// the duration of one send/receive round trip: exclusive ownership stays with the caller, the
/// queue only ever borrows.
pub struct DatagramHandle(*mut Datagram);

// SAFETY: the engine only ever touches a `DatagramHandle` from the thread that currently owns
// the cyclic exchange (enforced by the phase controller); datagrams are never queued from two
// threads at once.
unsafe impl Send for DatagramHandle {}

impl DatagramHandle {
    /// # Safety
    /// The caller must ensure `datagram` outlives the handle and is not mutated from elsewhere
    /// while queued.
    pub unsafe fn new(datagram: &mut Datagram) -> Self {
        Self(datagram as *mut Datagram)
    }

    fn get_mut(&mut self) -> &mut Datagram {
        // SAFETY: see `new`.
        unsafe { &mut *self.0 }
    }
}

/// Per-link engine state: pending queue, in-flight index table, timeout counters.
pub struct Engine {
    queue: Mutex<heapless::Deque<DatagramHandle, MAX_DATAGRAMS_PER_FRAME>>,
    in_flight: Mutex<[Option<DatagramHandle>; 256]>,
    next_index: Mutex<u8>,
    pdu_timeout: Duration,
    now: fn() -> Duration,
    pub timeouts: core::sync::atomic::AtomicU32,
    pub corrupted: core::sync::atomic::AtomicU32,
    pub unmatched: core::sync::atomic::AtomicU32,
}

impl Engine {
    pub fn new(pdu_timeout: Duration, now: fn() -> Duration) -> Self {
        Self {
            queue: Mutex::new(heapless::Deque::new()),
            in_flight: Mutex::new([const { None }; 256]),
            next_index: Mutex::new(0),
            pdu_timeout,
            now,
            timeouts: core::sync::atomic::AtomicU32::new(0),
            corrupted: core::sync::atomic::AtomicU32::new(0),
            unmatched: core::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Queue a datagram for the next `send()`. If it is already `Queued`, this is a no-op other
    /// than refreshing its state, matching the "FSMs rebuild in place" rule.
    pub fn queue(&self, datagram: &mut Datagram) -> Result<(), Error> {
        if datagram.state() == DatagramState::Queued {
            return Ok(());
        }

        let handle = unsafe { DatagramHandle::new(datagram) };

        let mut queue = self.queue.lock();
        queue
            .push_back(handle)
            .map_err(|_| Error::OutOfMemory)?;

        datagram.set_state(DatagramState::Queued);
        datagram.timestamps.queued_at = Some((self.now)());

        Ok(())
    }

    /// Assemble frames from the pending queue and hand them to `link`. May produce more than one
    /// frame if the queue doesn't fit `mtu` in one.
    pub fn send(&self, link: &mut dyn LinkDevice, mtu: usize, link_id: u8) -> Result<usize, Error> {
        let mut sent_frames = 0;
        let now = (self.now)();

        loop {
            let mut batch: heapless::Vec<DatagramHandle, MAX_DATAGRAMS_PER_FRAME> =
                heapless::Vec::new();

            {
                let mut queue = self.queue.lock();
                let mut in_flight = self.in_flight.lock();
                let mut next_index = self.next_index.lock();

                while let Some(mut handle) = queue.pop_front() {
                    if handle.get_mut().link != link_id {
                        // Not for this link; put it back and stop (preserves FIFO-per-link order
                        // well enough for the bounded queue sizes this system uses).
                        let _ = queue.push_front(handle);
                        break;
                    }

                    let Some(index) = allocate_index(&mut next_index, &in_flight) else {
                        let _ = queue.push_front(handle);
                        break;
                    };

                    handle.get_mut().index = index;
                    in_flight[index as usize] = Some(unsafe {
                        DatagramHandle::new(&mut *(handle.0))
                    });

                    if batch.push(handle).is_err() {
                        break;
                    }
                }
            }

            if batch.is_empty() {
                break;
            }

            let mut buf = [0u8; 1536];
            let mut refs: heapless::Vec<&mut Datagram, MAX_DATAGRAMS_PER_FRAME> =
                heapless::Vec::new();
            for h in batch.iter_mut() {
                let _ = refs.push(h.get_mut());
            }

            let (len, packed) = pack_frame(&mut buf, &mut refs)?;

            link.transmit(&buf[..len])?;
            sent_frames += 1;

            for dg in refs.into_iter().take(packed) {
                dg.set_state(DatagramState::Sent);
                dg.timestamps.sent_at = Some(now);
            }
        }

        Ok(sent_frames)
    }

    /// Poll `link` for received frames and demultiplex them into the matching in-flight
    /// datagrams, applying the mailbox dispatch rule where applicable.
    pub fn receive(&self, link: &mut dyn LinkDevice, link_id: u8, slaves: &mut [Slave]) -> Result<usize, Error> {
        let mut buf = [0u8; 1536];
        let mut received = 0;
        let now = (self.now)();

        loop {
            let n = link.receive_into(&mut buf)?;
            if n == 0 {
                break;
            }

            let reader = match FrameReader::new(&buf[..n]) {
                Ok(r) => r,
                Err(_) => {
                    self.corrupted.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
                    continue;
                }
            };

            for reply in reader {
                let reply = match reply {
                    Ok(r) => r,
                    Err(_) => {
                        self.corrupted.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
                        continue;
                    }
                };

                let mut in_flight = self.in_flight.lock();
                let Some(mut handle) = in_flight[reply.index as usize].take() else {
                    self.unmatched.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
                    continue;
                };
                drop(in_flight);

                let dg = handle.get_mut();

                if dg.command.code() != reply.command_code {
                    self.corrupted.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
                    dg.set_state(DatagramState::Errored);
                    continue;
                }

                mailbox::dispatch_received(dg, &reply, slaves);

                dg.working_counter = reply.working_counter;
                dg.set_state(DatagramState::Received);
                dg.timestamps.resolved_at = Some(now);

                received += 1;
            }
        }

        Ok(received)
    }

    /// Sweep in-flight datagrams whose timeout has elapsed, marking them `TimedOut`.
    pub fn sweep_timeouts(&self) -> usize {
        let now = (self.now)();
        let mut in_flight = self.in_flight.lock();
        let mut timed_out = 0;

        for slot in in_flight.iter_mut() {
            let Some(handle) = slot else { continue };
            // SAFETY: same invariant as `DatagramHandle::get_mut`.
            let dg = unsafe { &mut *handle.0 };

            if dg.state() != DatagramState::Sent {
                *slot = None;
                continue;
            }

            let Some(sent_at) = dg.timestamps.sent_at else {
                continue;
            };

            if now.saturating_sub(sent_at) > self.pdu_timeout {
                dg.set_state(DatagramState::TimedOut);
                dg.timestamps.resolved_at = Some(now);
                *slot = None;
                timed_out += 1;
                self.timeouts.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
                fmt::warn!("datagram timed out");
            }
        }

        timed_out
    }
}

fn allocate_index(next: &mut u8, in_flight: &[Option<DatagramHandle>; 256]) -> Option<u8> {
    let start = *next;

    loop {
        let candidate = *next;
        *next = next.wrapping_add(1);

        if in_flight[candidate as usize].is_none() {
            return Some(candidate);
        }

        if *next == start {
            return None;
        }
    }
}

#[allow(unused)]
fn _command_used(_: Command) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::link::LinkStats;
    use std::collections::VecDeque;

    struct LoopbackLink {
        inbox: VecDeque<heapless::Vec<u8, 1536>>,
    }

    impl LoopbackLink {
        fn new() -> Self {
            Self {
                inbox: VecDeque::new(),
            }
        }
    }

    impl LinkDevice for LoopbackLink {
        fn transmit(&mut self, frame: &[u8]) -> Result<usize, Error> {
            let mut echoed: heapless::Vec<u8, 1536> = heapless::Vec::new();
            let _ = echoed.extend_from_slice(frame);
            // Pretend every datagram got wc=1 (one slave answered).
            let len = echoed.len();
            if len >= 2 {
                echoed[len - 2] = 1;
                echoed[len - 1] = 0;
            }
            self.inbox.push_back(echoed);
            Ok(frame.len())
        }

        fn receive_into(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
            if let Some(frame) = self.inbox.pop_front() {
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(frame.len())
            } else {
                Ok(0)
            }
        }

        fn link_up(&self) -> bool {
            true
        }

        fn stats(&self) -> LinkStats {
            LinkStats::default()
        }
    }

    fn now() -> Duration {
        Duration::ZERO
    }

    #[test]
    fn send_then_receive_round_trip() {
        let engine = Engine::new(Duration::from_micros(500), now);
        let mut link = LoopbackLink::new();

        let mut dg = Datagram::new();
        dg.init(0, Command::brd(0), &[0, 0]);
        engine.queue(&mut dg).unwrap();

        let sent = engine.send(&mut link, 1500, 0).unwrap();
        assert_eq!(sent, 1);
        assert_eq!(dg.state(), DatagramState::Sent);

        let mut slaves: Vec<Slave> = Vec::new();
        let received = engine.receive(&mut link, 0, &mut slaves).unwrap();
        assert_eq!(received, 1);
        assert_eq!(dg.state(), DatagramState::Received);
        assert_eq!(dg.working_counter, 1);
    }

    #[test]
    fn index_allocator_wraps_and_exhausts() {
        let mut in_flight: [Option<DatagramHandle>; 256] = [const { None }; 256];
        let mut next = 0u8;

        for i in 0..256u16 {
            let idx = allocate_index(&mut next, &in_flight).unwrap();
            let mut dg = Box::leak(Box::new(Datagram::new()));
            dg.init(0, Command::Nop, &[]);
            in_flight[idx as usize] = Some(unsafe { DatagramHandle::new(dg) });
            let _ = i;
        }

        assert!(allocate_index(&mut next, &in_flight).is_none());
    }
}
