//! End-to-end SoE IDN read: mirrors `sdo_upload.rs`'s drive loop against a virtual slave that
//! answers with a canned `SoeOpCode::ReadResponse`.

mod support;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use ecat_master::mailbox::soe::{SoeHeader, SoeOpCode, IdnElement, SOE_HEADER_LEN};
use ecat_master::mailbox::{MailboxHeader, MailboxType, Priority, MAILBOX_HEADER_LEN};
use ecat_master::request::{self, RequestState};
use ecat_master::{Command, Datagram, Engine, Error, LinkDevice, LinkStats, Slave, SlaveFsm};

const RX_MAILBOX_OFFSET: u16 = 0x2000;
const TX_MAILBOX_OFFSET: u16 = 0x2080;

struct SoeSlaveLink {
    station_address: u16,
    reply: Vec<u8>,
    inbox: VecDeque<Vec<u8>>,
}

impl LinkDevice for SoeSlaveLink {
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
fn soe_read_idn_round_trip_resolves_request() {
    let station_address = 0x1002;
    let drive_no = 3u8;
    let idn = 0x71u16;
    let element_value: [u8; 2] = [0x10, 0x27];

    let mut body = [0u8; SOE_HEADER_LEN + 2];
    SoeHeader {
        op_code: SoeOpCode::ReadResponse,
        incomplete: false,
        error: false,
        drive_number: drive_no,
        element: IdnElement::DataValue,
    }
    .pack(&mut body[0..SOE_HEADER_LEN])
    .unwrap();
    body[SOE_HEADER_LEN..].copy_from_slice(&element_value);

    let mut reply = vec![0u8; MAILBOX_HEADER_LEN + body.len()];
    MailboxHeader {
        length: body.len() as u16,
        address: 0,
        priority: Priority::Lowest as u8,
        mailbox_type: MailboxType::Soe,
        counter: 1,
    }
    .pack(&mut reply[0..MAILBOX_HEADER_LEN])
    .unwrap();
    reply[MAILBOX_HEADER_LEN..].copy_from_slice(&body);

    let mut slave = Slave::new(0, station_address);
    slave.rx_mailbox_offset = RX_MAILBOX_OFFSET;
    slave.tx_mailbox_offset = TX_MAILBOX_OFFSET;
    slave.tx_mailbox_size = reply.len() as u16;
    slave.valid_mbox_data = true;

    let mut fsm = SlaveFsm::new();
    let req = Arc::new(request::soe::read_idn(0, drive_no, idn, element_value.len()).unwrap());
    fsm.soe.push(Arc::clone(&req));

    let engine = Engine::new(Duration::from_micros(500), now);
    let mut link = SoeSlaveLink {
        station_address,
        reply,
        inbox: VecDeque::new(),
    };
    let mut dg = Datagram::new();

    drive(&engine, &mut link, std::slice::from_mut(&mut slave), &mut fsm, &mut dg, &req, 8);

    assert_eq!(req.state(), RequestState::Success);
    let read = req.wait_result().unwrap();
    assert_eq!(&read[..], &element_value);
}
