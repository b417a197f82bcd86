//! Ethernet over EtherCAT fragment header and receive-time reassembly, ETG1000.6 Section 5.6.1.
//!
//! Only enough of EoE to carry a tunnelled Ethernet frame in and out of a slave's mailbox is
//! implemented; the slave-side EoE port configuration (IP/MAC assignment) this protocol also
//! defines is out of scope.

use crate::error::Error;
use crate::mailbox::Inbox;
use crate::slave::Slave;
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};

/// EoE frame type, carried in the low 4 bits of the fragment header's first word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum EoeFrameType {
    Fragment = 0x00,
    Timestamp = 0x01,
    SetIpRequest = 0x02,
    SetIpResponse = 0x03,
    SetAddrRequest = 0x04,
    SetAddrResponse = 0x05,
}

impl EoeFrameType {
    fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0x00 => Self::Fragment,
            0x01 => Self::Timestamp,
            0x02 => Self::SetIpRequest,
            0x03 => Self::SetIpResponse,
            0x04 => Self::SetAddrRequest,
            0x05 => Self::SetAddrResponse,
            _ => return None,
        })
    }
}

pub const EOE_HEADER_LEN: usize = 4;

/// EoE fragment header. Two little-endian words packed per ETG1000.6 Table 48.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EoeHeader {
    pub frame_type: EoeFrameType,
    pub port: u8,
    pub last_fragment: bool,
    pub fragment_number: u8,
    pub frame_number: u8,
    /// Byte offset (fragment 0) or 32-byte-block offset (later fragments) of this fragment.
    pub offset: u16,
}

impl EoeHeader {
    pub fn unpack(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < EOE_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::Decode));
        }

        let word0 = u16::unpack_from_slice(&buf[0..2])?;
        let word1 = u16::unpack_from_slice(&buf[2..4])?;

        let frame_type = EoeFrameType::from_u8(read_bits_u16(word0, 0, 4) as u8)
            .ok_or(Error::Pdu(crate::error::PduError::Decode))?;
        let port = read_bits_u16(word0, 4, 4) as u8;
        let last_fragment = read_bits_u16(word0, 8, 1) != 0;
        let fragment_number = read_bits_u16(word0, 10, 6) as u8;

        let frame_number = read_bits_u16(word1, 0, 4) as u8;
        let offset = read_bits_u16(word1, 4, 12);

        Ok(Self {
            frame_type,
            port,
            last_fragment,
            fragment_number,
            frame_number,
            offset,
        })
    }

    pub fn pack(&self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() < EOE_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::TooLong));
        }

        let mut word0 = write_bits_u16(0, 0, 4, self.frame_type as u16);
        word0 = write_bits_u16(word0, 4, 4, u16::from(self.port));
        word0 = write_bits_u16(word0, 8, 1, self.last_fragment as u16);
        word0 = write_bits_u16(word0, 10, 6, u16::from(self.fragment_number));

        let mut word1 = write_bits_u16(0, 0, 4, u16::from(self.frame_number));
        word1 = write_bits_u16(word1, 4, 12, self.offset);

        word0.pack_to_slice(&mut buf[0..2])?;
        word1.pack_to_slice(&mut buf[2..4])?;

        Ok(())
    }
}

/// EoE reassembly buffer: fragments accumulate here until `last_fragment`, at which point the
/// slave's reassembled Ethernet frame inbox is filled.
pub const EOE_REASSEMBLY_CAPACITY: usize = 1536;

/// Reassemble one EoE fragment into `slave`'s tunnelled-Ethernet inbox. Returns `true` if the
/// fragment was handled (whether or not it completed a frame), `false` if the header didn't
/// parse or wasn't a data fragment, letting the caller fall back to the raw datagram buffer.
pub fn dispatch(slave: &mut Slave, body: &[u8]) -> bool {
    let Ok(header) = EoeHeader::unpack(body) else {
        return false;
    };

    if header.frame_type != EoeFrameType::Fragment {
        return false;
    }

    let fragment_data = &body[EOE_HEADER_LEN..];
    let byte_offset = if header.fragment_number == 0 {
        usize::from(header.offset)
    } else {
        usize::from(header.offset) * 32
    };

    let end = byte_offset + fragment_data.len();
    if end > slave.eoe_rx.data.capacity() {
        return false;
    }

    if slave.eoe_rx.data.len() < end {
        slave.eoe_rx.data.resize_default(end).ok();
    }

    slave.eoe_rx.data[byte_offset..end].copy_from_slice(fragment_data);

    if header.last_fragment {
        slave.eoe_rx.payload_size = end;
    }

    true
}

#[allow(unused)]
fn _inbox_used(_: &Inbox<1>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = EoeHeader {
            frame_type: EoeFrameType::Fragment,
            port: 0,
            last_fragment: true,
            fragment_number: 2,
            frame_number: 5,
            offset: 10,
        };

        let mut buf = [0u8; EOE_HEADER_LEN];
        header.pack(&mut buf).unwrap();

        assert_eq!(EoeHeader::unpack(&buf).unwrap(), header);
    }
}
