//! A datagram sent over a link that never answers is swept into `TimedOut` once its PDU timeout
//! elapses, and the engine's timeout counter reflects it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ecat_master::{Command, Datagram, DatagramState, Engine, Error, LinkDevice, LinkStats};

/// A link that transmits successfully but never has anything to hand back, standing in for a
/// slave that has dropped off the bus mid-cycle.
struct MuteLink;

impl LinkDevice for MuteLink {
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, Error> {
        Ok(frame.len())
    }

    fn receive_into(&mut self, _buf: &mut [u8]) -> Result<usize, Error> {
        Ok(0)
    }

    fn link_up(&self) -> bool {
        true
    }

    fn stats(&self) -> LinkStats {
        LinkStats::default()
    }
}

static CLOCK_NANOS: AtomicU64 = AtomicU64::new(0);

fn clock() -> Duration {
    Duration::from_nanos(CLOCK_NANOS.load(Ordering::Relaxed))
}

#[test]
fn unanswered_datagram_times_out_and_is_counted() {
    CLOCK_NANOS.store(0, Ordering::Relaxed);

    let pdu_timeout = Duration::from_micros(500);
    let engine = Engine::new(pdu_timeout, clock);
    let mut link = MuteLink;

    let mut dg = Datagram::new();
    dg.init(0, Command::brd(0), &[0u8; 2]);
    engine.queue(&mut dg).unwrap();
    engine.send(&mut link, 1500, 0).unwrap();

    assert_eq!(dg.state(), DatagramState::Sent);

    let mut slaves = [];
    engine.receive(&mut link, 0, &mut slaves).unwrap();
    assert_eq!(dg.state(), DatagramState::Sent);

    CLOCK_NANOS.store((pdu_timeout * 2).as_nanos() as u64, Ordering::Relaxed);

    let swept = engine.sweep_timeouts();

    assert_eq!(swept, 1);
    assert_eq!(dg.state(), DatagramState::TimedOut);
    assert_eq!(engine.timeouts.load(Ordering::Relaxed), 1);
}
