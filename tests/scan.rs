//! End-to-end bring-up scenario: a bus with three slaves, driven entirely through
//! [`MasterFsm::run_cycle`] over a virtual link, comes out of one scan with all three discovered
//! and assigned configured station addresses in ring order.

mod support;

use std::collections::VecDeque;

use ecat_master::register::RegisterAddress;
use ecat_master::{Command, Datagram, Engine, Error, LinkDevice, LinkStats, MasterFsm, Slave, SlaveFsm};

/// Stands in for three slaves answering broadcast AL-status polls, auto-increment probes, and
/// fixed-address register traffic once a configured station address has been handed out. Mirrors
/// the `FixedWkcLink`/`ThreeThenSilent` doubles the master FSM's own unit tests use, but inspects
/// each outgoing datagram's command instead of returning one fixed working counter for everything.
struct ThreeSlaves {
    inbox: VecDeque<Vec<u8>>,
    station_addresses: [Option<u16>; 3],
}

impl ThreeSlaves {
    fn new() -> Self {
        Self {
            inbox: VecDeque::new(),
            station_addresses: [None; 3],
        }
    }
}

impl LinkDevice for ThreeSlaves {
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, Error> {
        let mut echoed = frame.to_vec();
        let outgoing = support::decode_first(&echoed);

        let wkc: u16 = match outgoing.command {
            Command::Brd { .. } => 3,
            Command::Aprd { address, .. } => {
                let position = 0u16.wrapping_sub(address);
                if position < 3 {
                    1
                } else {
                    0
                }
            }
            Command::Apwr { address, register } if register == RegisterAddress::ConfiguredStationAddress as u16 => {
                let position = 0u16.wrapping_sub(address);
                if position < 3 {
                    let start = outgoing.payload_start;
                    let station = u16::from_le_bytes([echoed[start], echoed[start + 1]]);
                    self.station_addresses[position as usize] = Some(station);
                    1
                } else {
                    0
                }
            }
            Command::Fprd { address, .. } | Command::Fpwr { address, .. } => {
                if self.station_addresses.contains(&Some(address)) {
                    1
                } else {
                    0
                }
            }
            _ => 0,
        };

        support::set_working_counter(&mut echoed, wkc);
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

fn now() -> std::time::Duration {
    std::time::Duration::ZERO
}

#[test]
fn scan_discovers_three_slaves_and_assigns_station_addresses() {
    let engine = Engine::new(std::time::Duration::from_micros(500), now);
    let mut link = ThreeSlaves::new();
    let mut fsm = MasterFsm::new();

    let mut slaves: Vec<Slave> = Vec::new();
    let mut slave_fsms: Vec<SlaveFsm> = Vec::new();
    let mut slave_datagrams: Vec<Datagram> = Vec::new();
    let mut dg = Datagram::new();

    fsm.run_cycle(&engine, &mut link, 0, &mut slaves, &mut slave_fsms, &mut slave_datagrams, &mut dg)
        .unwrap();

    assert_eq!(slaves.len(), 3);
    assert_eq!(slave_fsms.len(), 3);
    assert_eq!(slave_datagrams.len(), 3);

    for (position, slave) in slaves.iter().enumerate() {
        assert_eq!(slave.station_address, 0x03e9 + position as u16);
    }
}
