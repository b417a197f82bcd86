//! Drives a `Master` through its full `Orphaned -> Idle -> Operation -> Idle` lifecycle against a
//! link nothing answers on, exercising the real background worker threads rather than the phase
//! controller's internals directly.

use std::time::Duration;

use ecat_master::{Error, LinkDevice, LinkStats, Master, MasterConfig, Phase};

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

#[test]
fn master_moves_through_idle_and_operation_and_back() {
    let master = Master::new(Box::new(MuteLink), MasterConfig::default());
    assert_eq!(master.phase(), Phase::Orphaned);

    master.start();
    assert_eq!(master.phase(), Phase::Idle);

    // A handful of idle cycles against a link with nothing on it: each scan attempt sees zero
    // responding slaves and completes immediately, so this never blocks waiting on the bus.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(master.slave_count(), 0);

    master.activate();
    assert_eq!(master.phase(), Phase::Operation);

    master.send().unwrap();
    master.receive().unwrap();

    master.deactivate();
    assert_eq!(master.phase(), Phase::Idle);
}
