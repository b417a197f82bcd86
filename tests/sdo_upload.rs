//! End-to-end expedited SDO upload: a single slave's mailbox FSM is driven across real
//! `Engine::send`/`receive` round trips against a virtual slave, ending in the application's
//! `Request` resolving with the uploaded bytes.

mod support;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use ecat_master::mailbox::coe::SubIndex;
use ecat_master::request::{self, RequestState};
use ecat_master::{Command, Datagram, Engine, Error, LinkDevice, LinkStats, Slave, SlaveFsm};

const RX_MAILBOX_OFFSET: u16 = 0x1000;
const TX_MAILBOX_OFFSET: u16 = 0x1080;

/// Answers the two FPWR/FPRD round trips an expedited SDO upload needs: ack the mailbox write,
/// then hand back a canned CoE "SDO response" on the first poll.
struct CoeSlaveLink {
    station_address: u16,
    reply: Vec<u8>,
    inbox: VecDeque<Vec<u8>>,
}

impl LinkDevice for CoeSlaveLink {
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, Error> {
        let mut echoed = frame.to_vec();
        let outgoing = support::decode_first(&echoed);

        let wkc: u16 = match outgoing.command {
            Command::Fpwr { address, register } if address == self.station_address && register == RX_MAILBOX_OFFSET => 1,
            Command::Fprd { address, register } if address == self.station_address && register == TX_MAILBOX_OFFSET => {
                let start = outgoing.payload_start;
                let n = self.reply.len().min(outgoing.payload_len);
                echoed[start..start + n].copy_from_slice(&self.reply[..n]);
                1
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

fn now() -> Duration {
    Duration::ZERO
}

/// Steps the FSM, queues whatever it produced, and flushes one send/receive/sweep round, up to
/// `max_cycles` times or until `req`'s state leaves QUEUED/BUSY.
fn drive(
    engine: &Engine,
    link: &mut dyn LinkDevice,
    slaves: &mut [Slave],
    fsm: &mut SlaveFsm,
    dg: &mut Datagram,
    req: &Arc<request::Request>,
    max_cycles: usize,
) {
    for _ in 0..max_cycles {
        if !matches!(req.state(), RequestState::Queued | RequestState::Busy) {
            return;
        }

        if !fsm.is_busy() && !fsm.ready_to_start(&slaves[0]) {
            continue;
        }

        if fsm.step(&mut slaves[0], dg) {
            engine.queue(dg).unwrap();
        }

        engine.send(link, 1500, 0).unwrap();
        engine.receive(link, 0, slaves).unwrap();
        engine.sweep_timeouts();
    }
}

#[test]
fn sdo_upload_round_trip_resolves_request() {
    let station_address = 0x1001;
    let index = 0x1018u16;
    let sub_index = SubIndex::Index(1);
    let value: u8 = 0x2a;

    let reply = ecat_master::mailbox::coe::download_expedited(1, index, sub_index, [value, 0, 0, 0], 1);

    let mut slave = Slave::new(0, station_address);
    slave.rx_mailbox_offset = RX_MAILBOX_OFFSET;
    slave.tx_mailbox_offset = TX_MAILBOX_OFFSET;
    slave.tx_mailbox_size = reply.len() as u16;
    slave.valid_mbox_data = true;

    let mut fsm = SlaveFsm::new();
    let req = Arc::new(request::coe::sdo_upload(0, index, sub_index, 1));
    fsm.coe.push(Arc::clone(&req));

    let engine = Engine::new(Duration::from_micros(500), now);
    let mut link = CoeSlaveLink {
        station_address,
        reply: reply.to_vec(),
        inbox: VecDeque::new(),
    };
    let mut dg = Datagram::new();

    drive(&engine, &mut link, std::slice::from_mut(&mut slave), &mut fsm, &mut dg, &req, 8);

    assert_eq!(req.state(), RequestState::Success);
    let uploaded = req.wait_result().unwrap();
    assert_eq!(&uploaded[..], &[value]);
}
