//! Exercises the receive-time mailbox routing rule directly through `Engine::receive`: a reply
//! addressed to one slave's mailbox lands in that slave's inbox and leaves the other slave and
//! the datagram's own payload untouched.

mod support;

use std::collections::VecDeque;
use std::time::Duration;

use ecat_master::mailbox::coe::{CoeHeader, CoeService, COE_HEADER_LEN};
use ecat_master::mailbox::{MailboxHeader, MailboxType, Priority, MAILBOX_HEADER_LEN};
use ecat_master::{Command, Datagram, Engine, Error, LinkDevice, LinkStats, Slave};

const TX_MAILBOX_OFFSET: u16 = 0x1080;

struct EchoWithReply {
    target_station: u16,
    reply: Vec<u8>,
    inbox: VecDeque<Vec<u8>>,
}

impl LinkDevice for EchoWithReply {
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, Error> {
        let mut echoed = frame.to_vec();
        let outgoing = support::decode_first(&echoed);

        let wkc: u16 = match outgoing.command {
            Command::Fprd { address, register } if address == self.target_station && register == TX_MAILBOX_OFFSET => {
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

#[test]
fn reply_routes_to_the_matching_slave_only_and_leaves_datagram_payload_alone() {
    let target_station = 0x2001;
    let other_station = 0x2002;

    let mut body = [0u8; COE_HEADER_LEN + 4];
    CoeHeader {
        service: CoeService::Emergency,
    }
    .pack(&mut body[0..COE_HEADER_LEN])
    .unwrap();
    body[COE_HEADER_LEN..].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

    let mut reply = vec![0u8; MAILBOX_HEADER_LEN + body.len()];
    MailboxHeader {
        length: body.len() as u16,
        address: 0,
        priority: Priority::Lowest as u8,
        mailbox_type: MailboxType::Coe,
        counter: 1,
    }
    .pack(&mut reply[0..MAILBOX_HEADER_LEN])
    .unwrap();
    reply[MAILBOX_HEADER_LEN..].copy_from_slice(&body);

    let mut target = Slave::new(0, target_station);
    target.tx_mailbox_offset = TX_MAILBOX_OFFSET;
    target.tx_mailbox_size = reply.len() as u16;
    target.valid_mbox_data = true;

    let mut other = Slave::new(1, other_station);
    other.tx_mailbox_offset = TX_MAILBOX_OFFSET;
    other.tx_mailbox_size = reply.len() as u16;
    other.valid_mbox_data = true;

    let mut slaves = [target, other];

    let engine = Engine::new(Duration::from_micros(500), now);
    let mut link = EchoWithReply {
        target_station,
        reply,
        inbox: VecDeque::new(),
    };

    let request_payload = [0xaa; 16];
    let mut dg = Datagram::new();
    dg.init(0, Command::fprd(target_station, TX_MAILBOX_OFFSET), &request_payload);
    engine.queue(&mut dg).unwrap();
    engine.send(&mut link, 1500, 0).unwrap();
    let received = engine.receive(&mut link, 0, &mut slaves).unwrap();

    assert_eq!(received, 1);
    assert_eq!(dg.working_counter, 1);

    assert_eq!(slaves[0].mbox_coe.payload(), &body[..]);
    assert_eq!(slaves[1].mbox_coe.payload_size, 0);
    assert_eq!(dg.payload(), &request_payload);
}
