//! The phase controller: owns the background threads that drive the cyclic exchange, and the
//! `Orphaned -> Idle -> Operation` lifecycle a master moves through from construction to a fully
//! configured, running bus.
//!
//! Grounded on the blocking TX/RX task pattern in `std/unix.rs` and the thread-pinning advice in
//! `std/windows.rs`'s `TxRxTaskConfig` doc comment, generalised from "one task the caller drives"
//! into "a background thread the phase controller owns and swaps out across transitions."

use crate::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Where the master currently stands in its scan/configure/run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No worker running; the master has not been started yet.
    Orphaned,
    /// The idle worker is scanning and configuring slaves at a leisurely pace.
    Idle,
    /// The application owns (or has handed off) the cyclic exchange; slave FSMs still run in the
    /// background to service mailbox requests between process data cycles.
    Operation,
}

struct Worker {
    should_stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn stop(self) {
        self.should_stop.store(true, Ordering::Release);
        let _ = self.handle.join();
    }
}

/// Owns the background thread(s) backing whichever [`Phase`] the master is in, and the one
/// (optional) EoE polling thread that runs independently of phase.
pub struct PhaseController {
    phase: Mutex<Phase>,
    condvar: Condvar,
    worker: Mutex<Option<Worker>>,
    eoe: Mutex<Option<Worker>>,
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseController {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Orphaned),
            condvar: Condvar::new(),
            worker: Mutex::new(None),
            eoe: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().expect("phase mutex poisoned")
    }

    /// Block the calling thread until the phase reaches `target`.
    pub fn wait_for(&self, target: Phase) {
        let guard = self.phase.lock().expect("phase mutex poisoned");
        drop(self.condvar.wait_while(guard, |p| *p != target));
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().expect("phase mutex poisoned") = phase;
        self.condvar.notify_all();
    }

    fn stop_worker(&self) {
        if let Some(worker) = self.worker.lock().expect("worker mutex poisoned").take() {
            worker.stop();
        }
    }

    /// Stop any currently running worker and start the idle cycle: `cycle` runs once per
    /// `period`, scanning and configuring slaves without handing the cyclic exchange to the
    /// application.
    pub fn enter_idle<F>(&self, period: Duration, mut cycle: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop_worker();

        let should_stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&should_stop);

        let handle = thread::Builder::new()
            .name("ecat-idle".into())
            .spawn(move || {
                raise_priority("idle");

                while !flag.load(Ordering::Acquire) {
                    cycle();
                    spin_sleep::sleep(period);
                }
            })
            .expect("failed to spawn idle worker thread");

        *self.worker.lock().expect("worker mutex poisoned") = Some(Worker { should_stop, handle });
        self.set_phase(Phase::Idle);
    }

    /// Stop the idle worker, wait for any in-progress scan to drain, and start the FSM-only
    /// worker: `fsm_cycle` steps every slave's mailbox FSM once per `period` but never touches
    /// process data, since the application now owns `send()`/`receive()` for that.
    pub fn enter_operation<D, F>(&self, period: Duration, mut scan_busy: D, mut fsm_cycle: F)
    where
        D: FnMut() -> bool + Send + 'static,
        F: FnMut() + Send + 'static,
    {
        self.stop_worker();

        while scan_busy() {
            spin_sleep::sleep(Duration::from_millis(1));
        }

        let should_stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&should_stop);

        let handle = thread::Builder::new()
            .name("ecat-fsm".into())
            .spawn(move || {
                if let Some(core) = core_affinity::get_core_ids().and_then(|ids| ids.into_iter().next()) {
                    core_affinity::set_for_current(core);
                }
                raise_priority("fsm");

                while !flag.load(Ordering::Acquire) {
                    fsm_cycle();
                    spin_sleep::sleep(period);
                }
            })
            .expect("failed to spawn fsm worker thread");

        *self.worker.lock().expect("worker mutex poisoned") = Some(Worker { should_stop, handle });
        self.set_phase(Phase::Operation);
    }

    /// Hand the cyclic exchange back to the idle worker, if currently in [`Phase::Operation`].
    /// A no-op in any other phase.
    pub fn deactivate<F>(&self, period: Duration, idle_cycle: F)
    where
        F: FnMut() + Send + 'static,
    {
        if self.phase() != Phase::Operation {
            return;
        }

        self.enter_idle(period, idle_cycle);
    }

    /// Start the EoE forwarding thread, independent of `phase()`. A second call while one is
    /// already running is a no-op.
    pub fn start_eoe<F>(&self, mut poll: F)
    where
        F: FnMut() + Send + 'static,
    {
        let mut eoe = self.eoe.lock().expect("eoe mutex poisoned");
        if eoe.is_some() {
            return;
        }

        let should_stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&should_stop);

        let handle = thread::Builder::new()
            .name("ecat-eoe".into())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    poll();
                    thread::sleep(Duration::from_millis(1));
                }
            })
            .expect("failed to spawn EoE worker thread");

        *eoe = Some(Worker { should_stop, handle });
    }
}

fn raise_priority(worker_name: &str) {
    if let Err(e) = thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max) {
        fmt::warn!("{} worker: failed to raise thread priority: {:?}", worker_name, e);
    }
}

impl Drop for PhaseController {
    fn drop(&mut self) {
        self.stop_worker();
        if let Some(worker) = self.eoe.lock().expect("eoe mutex poisoned").take() {
            worker.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn idle_then_operation_transition() {
        let controller = PhaseController::new();
        assert_eq!(controller.phase(), Phase::Orphaned);

        let idle_ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&idle_ticks);
        controller.enter_idle(Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(controller.phase(), Phase::Idle);

        std::thread::sleep(Duration::from_millis(20));
        assert!(idle_ticks.load(Ordering::Relaxed) > 0);

        let fsm_ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fsm_ticks);
        controller.enter_operation(Duration::from_millis(1), || false, move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(controller.phase(), Phase::Operation);

        std::thread::sleep(Duration::from_millis(20));
        assert!(fsm_ticks.load(Ordering::Relaxed) > 0);

        controller.deactivate(Duration::from_millis(1), || {});
        assert_eq!(controller.phase(), Phase::Idle);

        // deactivate() is a no-op outside Operation.
        controller.deactivate(Duration::from_millis(1), || {});
        assert_eq!(controller.phase(), Phase::Idle);
    }
}
