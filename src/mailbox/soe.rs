//! Servo profile over EtherCAT (IDN read/write), ETG1000.6 Section 5.6.4 / IEC 61800-7-304.
//!
//! Grounded on `ec_soe_requests_example.c`'s `ecrt_slave_config_create_soe_request` /
//! `ecrt_master_read_idn` usage: a request names a drive number and an IDN, and distinguishes a
//! plain element read from a write of a given size.

use crate::error::Error;
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};

/// SoE opcode, carried in the header's 3-bit `op_code` field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SoeOpCode {
    ReadRequest = 0x1,
    ReadResponse = 0x2,
    WriteRequest = 0x3,
    WriteResponse = 0x4,
    Notification = 0x5,
    Emergency = 0x6,
}

impl SoeOpCode {
    fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0x1 => Self::ReadRequest,
            0x2 => Self::ReadResponse,
            0x3 => Self::WriteRequest,
            0x4 => Self::WriteResponse,
            0x5 => Self::Notification,
            0x6 => Self::Emergency,
            _ => return None,
        })
    }
}

/// Which IDN element(s) a request addresses. The data list value (0x01) is by far the common
/// case; the others exist for completeness of the standard's element set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum IdnElement {
    DataState = 0x00,
    DataValue = 0x01,
    Name = 0x02,
    Attribute = 0x03,
    Unit = 0x04,
    Min = 0x05,
    Max = 0x06,
    Default = 0x07,
}

/// 4-byte SoE header prefixing the IDN payload within a mailbox payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SoeHeader {
    pub op_code: SoeOpCode,
    pub incomplete: bool,
    pub error: bool,
    pub drive_number: u8,
    pub element: IdnElement,
}

pub const SOE_HEADER_LEN: usize = 4;

impl SoeHeader {
    pub fn unpack(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < SOE_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::Decode));
        }

        let byte0 = u16::from(buf[0]);
        let op_code = SoeOpCode::from_u8(read_bits_u16(byte0, 0, 3) as u8)
            .ok_or(Error::Pdu(crate::error::PduError::Decode))?;
        let incomplete = read_bits_u16(byte0, 3, 1) != 0;
        let error = read_bits_u16(byte0, 4, 1) != 0;
        let drive_number = read_bits_u16(byte0, 5, 3) as u8;

        let element = match buf[1] & 0x07 {
            0x00 => IdnElement::DataState,
            0x01 => IdnElement::DataValue,
            0x02 => IdnElement::Name,
            0x03 => IdnElement::Attribute,
            0x04 => IdnElement::Unit,
            0x05 => IdnElement::Min,
            0x06 => IdnElement::Max,
            _ => IdnElement::Default,
        };

        Ok(Self {
            op_code,
            incomplete,
            error,
            drive_number,
            element,
        })
    }

    pub fn pack(&self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() < SOE_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::TooLong));
        }

        let mut byte0 = write_bits_u16(0, 0, 3, self.op_code as u16);
        byte0 = write_bits_u16(byte0, 3, 1, self.incomplete as u16);
        byte0 = write_bits_u16(byte0, 4, 1, self.error as u16);
        byte0 = write_bits_u16(byte0, 5, 3, u16::from(self.drive_number));
        buf[0] = byte0 as u8;
        buf[1] = self.element as u8;
        buf[2..4].copy_from_slice(&[0, 0]);

        Ok(())
    }
}

/// Build an IDN read request for `drive_number`/`idn`, targeting the data value element.
pub fn read_idn(drive_number: u8, idn: u16) -> [u8; 6] {
    let mut buf = [0u8; 6];

    let _ = SoeHeader {
        op_code: SoeOpCode::ReadRequest,
        incomplete: false,
        error: false,
        drive_number,
        element: IdnElement::DataValue,
    }
    .pack(&mut buf[0..4]);

    idn.pack_to_slice(&mut buf[4..6]).ok();
    buf
}

/// Build an IDN write request header; the caller appends up to `len` bytes of element data.
pub fn write_idn_header(drive_number: u8, idn: u16) -> [u8; 6] {
    let mut buf = [0u8; 6];

    let _ = SoeHeader {
        op_code: SoeOpCode::WriteRequest,
        incomplete: false,
        error: false,
        drive_number,
        element: IdnElement::DataValue,
    }
    .pack(&mut buf[0..4]);

    idn.pack_to_slice(&mut buf[4..6]).ok();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = SoeHeader {
            op_code: SoeOpCode::ReadRequest,
            incomplete: false,
            error: false,
            drive_number: 7,
            element: IdnElement::DataValue,
        };

        let mut buf = [0u8; SOE_HEADER_LEN];
        header.pack(&mut buf).unwrap();

        assert_eq!(SoeHeader::unpack(&buf).unwrap(), header);
    }

    #[test]
    fn read_idn_targets_requested_idn() {
        let buf = read_idn(9, 0x71);
        assert_eq!(u16::unpack_from_slice(&buf[4..6]).unwrap(), 0x71);

        let header = SoeHeader::unpack(&buf[0..4]).unwrap();
        assert_eq!(header.drive_number, 9);
        assert_eq!(header.op_code, SoeOpCode::ReadRequest);
    }
}
