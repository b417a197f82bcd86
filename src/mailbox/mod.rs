//! Mailbox header and the receive-time dispatch rule that routes mailbox replies into
//! per-slave, per-protocol inboxes.

pub mod coe;
pub mod eoe;
pub mod foe;
pub mod gateway;
pub mod soe;

use crate::datagram::Datagram;
use crate::frame::ReceivedDatagram;
use crate::slave::Slave;
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};
use crate::error::Error;

/// Mailbox protocol discriminant (ETG1000.6 Table 29).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum MailboxType {
    /// Mailbox error reply.
    Err = 0x00,
    /// ADS over EtherCAT.
    Aoe = 0x01,
    /// Ethernet over EtherCAT.
    Eoe = 0x02,
    /// CAN over EtherCAT.
    Coe = 0x03,
    /// File access over EtherCAT.
    Foe = 0x04,
    /// Servo profile over EtherCAT.
    Soe = 0x05,
    /// Vendor-specific mailbox protocol.
    VendorSpecific = 0x0f,
    /// Any other value, kept so a dispatch miss can still be logged with the raw byte.
    Other(u8),
}

impl MailboxType {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0x00 => Self::Err,
            0x01 => Self::Aoe,
            0x02 => Self::Eoe,
            0x03 => Self::Coe,
            0x04 => Self::Foe,
            0x05 => Self::Soe,
            0x0f => Self::VendorSpecific,
            other => Self::Other(other),
        }
    }

    fn as_u8(&self) -> u8 {
        match self {
            Self::Err => 0x00,
            Self::Aoe => 0x01,
            Self::Eoe => 0x02,
            Self::Coe => 0x03,
            Self::Foe => 0x04,
            Self::Soe => 0x05,
            Self::VendorSpecific => 0x0f,
            Self::Other(raw) => *raw,
        }
    }
}

/// Mailbox priority, carried in the header but rarely used by slaves.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Priority {
    Lowest = 0,
    Low = 1,
    High = 2,
    Highest = 3,
}

/// 6-byte mailbox header prefixing every mailbox payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MailboxHeader {
    pub length: u16,
    pub address: u16,
    pub priority: u8,
    pub mailbox_type: MailboxType,
    pub counter: u8,
}

pub const MAILBOX_HEADER_LEN: usize = 6;

impl MailboxHeader {
    pub fn unpack(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < MAILBOX_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::Decode));
        }

        let length = u16::unpack_from_slice(&buf[0..2])?;
        let address = u16::unpack_from_slice(&buf[2..4])?;

        let type_counter = buf[4];
        let priority_type = buf[5];

        let priority = read_bits_u16(u16::from(type_counter), 6, 2) as u8;
        let mailbox_type = MailboxType::from_u8(read_bits_u16(u16::from(priority_type), 0, 4) as u8);
        let counter = read_bits_u16(u16::from(priority_type), 4, 3) as u8;

        Ok(Self {
            length,
            address,
            priority,
            mailbox_type,
            counter,
        })
    }

    pub fn pack(&self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() < MAILBOX_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::TooLong));
        }

        self.length.pack_to_slice(&mut buf[0..2])?;
        self.address.pack_to_slice(&mut buf[2..4])?;

        let byte4 = write_bits_u16(0, 6, 2, u16::from(self.priority)) as u8;
        buf[4] = byte4;

        let mut byte5 = write_bits_u16(0, 0, 4, u16::from(self.mailbox_type.as_u8()));
        byte5 = write_bits_u16(byte5, 4, 3, u16::from(self.counter));
        buf[5] = byte5 as u8;

        Ok(())
    }
}

/// A per-slave, per-protocol inbox buffer: a fixed-capacity payload area plus how much of it is
/// currently valid.
#[derive(Default)]
pub struct Inbox<const N: usize> {
    pub data: heapless::Vec<u8, N>,
    pub payload_size: usize,
}

impl<const N: usize> Inbox<N> {
    pub fn fill(&mut self, payload: &[u8]) -> bool {
        if payload.len() > N {
            return false;
        }

        self.data.clear();
        let _ = self.data.extend_from_slice(payload);
        self.payload_size = payload.len();

        true
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.payload_size]
    }
}

/// Receive-time mailbox routing rule.
///
/// Invoked by the engine on every `Fprd` reply with a non-zero working counter. Looks up the
/// *specific* slave whose `(station_address, tx_mailbox_offset)` matches the datagram's
/// addressing; if none matches, falls through to leaving the payload in the datagram buffer
/// (this is the explicit `Option`-match fix for the "no slave matched" case described in
/// DESIGN.md's Open Question resolution 1 — there is no stale loop-iteration variable to
/// accidentally reuse).
pub fn dispatch_received(dg: &mut Datagram, reply: &ReceivedDatagram<'_>, slaves: &mut [Slave]) {
    let is_fprd = dg.command.code() == crate::command::Command::fprd(0, 0).code();

    if !is_fprd || reply.working_counter == 0 {
        copy_into_datagram(dg, reply.payload);
        return;
    }

    let station_address = u16::from_le_bytes([reply.address[0], reply.address[1]]);
    let offset = u16::from_le_bytes([reply.address[2], reply.address[3]]);

    let matched = slaves.iter_mut().find(|s| {
        s.valid_mbox_data && s.station_address == station_address && s.tx_mailbox_offset == offset
    });

    let Some(slave) = matched else {
        copy_into_datagram(dg, reply.payload);
        return;
    };

    let Ok(header) = MailboxHeader::unpack(reply.payload) else {
        copy_into_datagram(dg, reply.payload);
        return;
    };

    let body = &reply.payload[MAILBOX_HEADER_LEN..];

    if let Some(mbg_offset) = slave.mbg_offset {
        if header.address == station_address.wrapping_add(mbg_offset).wrapping_sub(1) {
            if slave.mbox_mbg.fill(body) {
                return;
            }
            copy_into_datagram(dg, reply.payload);
            return;
        }
    }

    let routed = match header.mailbox_type {
        MailboxType::Coe => slave.mbox_coe.fill(body),
        MailboxType::Foe => slave.mbox_foe.fill(body),
        MailboxType::Soe => slave.mbox_soe.fill(body),
        MailboxType::VendorSpecific => slave.mbox_voe.fill(body),
        MailboxType::Eoe => eoe::dispatch(slave, body),
        _ => false,
    };

    if !routed {
        copy_into_datagram(dg, reply.payload);
    }
}

fn copy_into_datagram(dg: &mut Datagram, payload: &[u8]) {
    dg.set_payload_len(payload.len());
    let dst = dg.payload_mut();
    let n = dst.len().min(payload.len());
    dst[..n].copy_from_slice(&payload[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = MailboxHeader {
            length: 10,
            address: 0,
            priority: 0,
            mailbox_type: MailboxType::Coe,
            counter: 3,
        };

        let mut buf = [0u8; MAILBOX_HEADER_LEN];
        header.pack(&mut buf).unwrap();

        let parsed = MailboxHeader::unpack(&buf).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn no_slave_matched_falls_through_to_datagram_buffer() {
        let mut dg = Datagram::new();
        dg.init(0, crate::command::Command::fprd(0, 0), &[0u8; 16]);

        let payload = [0u8; 16];
        let reply = ReceivedDatagram {
            command_code: dg.command.code(),
            index: 0,
            address: [0x01, 0x10, 0x00, 0x00],
            payload: &payload,
            working_counter: 1,
        };

        let mut slaves: Vec<Slave> = Vec::new();

        dispatch_received(&mut dg, &reply, &mut slaves);

        assert_eq!(dg.payload(), &payload);
    }
}
