//! The external datagram ring: lets FSMs inject datagrams into the cyclic send without the RT
//! path ever allocating.
//!
//! A fixed-array-plus-rolling-index arena repurposed as a single-producer-single-consumer
//! handoff: FSMs (producer) stage and commit
//! slots, the RT send path (consumer) injects committed slots into the engine's queue.

use crate::datagram::{Datagram, DatagramState};
use crate::engine::Engine;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::time::Duration;

/// A fixed-size ring of pre-allocated datagrams shared between FSMs and the RT send path.
pub struct ExternalRing<const N: usize> {
    slots: [Datagram; N],
    staged_at: [Option<Duration>; N],
    idx_rt: AtomicUsize,
    idx_fsm: AtomicUsize,
    injection_timeout: Duration,
}

impl<const N: usize> ExternalRing<N> {
    pub fn new(injection_timeout: Duration) -> Self {
        Self {
            slots: core::array::from_fn(|_| Datagram::new()),
            staged_at: [None; N],
            idx_rt: AtomicUsize::new(0),
            idx_fsm: AtomicUsize::new(0),
            injection_timeout,
        }
    }

    fn full(&self) -> bool {
        let fsm = self.idx_fsm.load(Ordering::Acquire);
        let rt = self.idx_rt.load(Ordering::Acquire);
        (fsm + 1) % N == rt
    }

    /// FSM side: claim the next free slot to fill in, or `None` if the ring is full.
    pub fn stage(&mut self, now: Duration) -> Option<(&mut Datagram, usize)> {
        if self.full() {
            return None;
        }

        let idx = self.idx_fsm.load(Ordering::Acquire);
        self.staged_at[idx] = Some(now);

        Some((&mut self.slots[idx], idx))
    }

    /// FSM side: the datagram at `idx` has been set to `Init` and is ready for injection.
    pub fn commit(&mut self, idx: usize) {
        debug_assert_eq!(idx, self.idx_fsm.load(Ordering::Acquire));
        self.idx_fsm
            .store((idx + 1) % N, Ordering::Release);
    }

    /// RT side: advance `idx_rt` through committed slots, queueing each onto `engine` as long as
    /// doing so keeps the running total under `max_queue_bytes`. Returns the number injected.
    pub fn inject(&mut self, engine: &Engine, max_queue_bytes: usize, now: Duration) -> usize {
        let mut injected = 0;
        let mut budget = max_queue_bytes;

        loop {
            let rt = self.idx_rt.load(Ordering::Acquire);
            let fsm = self.idx_fsm.load(Ordering::Acquire);

            if rt == fsm {
                break;
            }

            let dg = &mut self.slots[rt];

            if dg.state() != DatagramState::Init {
                // Not actually filled in yet (shouldn't happen if `commit` is used correctly);
                // skip rather than stall the ring.
                self.idx_rt.store((rt + 1) % N, Ordering::Release);
                continue;
            }

            let size = dg.payload().len();

            if size > max_queue_bytes {
                dg.set_state(DatagramState::Errored);
                self.idx_rt.store((rt + 1) % N, Ordering::Release);
                continue;
            }

            if let Some(staged_at) = self.staged_at[rt] {
                if now.saturating_sub(staged_at) > self.injection_timeout {
                    dg.set_state(DatagramState::Errored);
                    self.idx_rt.store((rt + 1) % N, Ordering::Release);
                    continue;
                }
            }

            if size > budget {
                break;
            }

            if engine.queue(dg).is_err() {
                break;
            }

            budget -= size;
            self.idx_rt.store((rt + 1) % N, Ordering::Release);
            injected += 1;
        }

        injected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn stage_fails_when_full() {
        let mut ring: ExternalRing<4> = ExternalRing::new(Duration::from_millis(100));

        // Capacity is N-1 usable slots (one slot always kept as the "empty" sentinel).
        for _ in 0..3 {
            let (dg, idx) = ring.stage(Duration::ZERO).expect("slot available");
            dg.init(0, Command::Nop, &[]);
            ring.commit(idx);
        }

        assert!(ring.stage(Duration::ZERO).is_none());
    }

    #[test]
    fn inject_frees_a_slot_for_staging() {
        let engine = Engine::new(Duration::from_micros(500), || Duration::ZERO);
        let mut ring: ExternalRing<4> = ExternalRing::new(Duration::from_millis(100));

        for _ in 0..3 {
            let (dg, idx) = ring.stage(Duration::ZERO).expect("slot available");
            dg.init(0, Command::Nop, &[]);
            ring.commit(idx);
        }

        assert!(ring.stage(Duration::ZERO).is_none());

        let injected = ring.inject(&engine, 1500, Duration::ZERO);
        assert_eq!(injected, 3);

        assert!(ring.stage(Duration::ZERO).is_some());
    }
}
