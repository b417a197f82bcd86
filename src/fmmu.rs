//! Fieldbus Memory Management Unit (FMMU).
//!
//! Used to map segments of the Process Data Image (PDI) to various parts of the slave memory
//! space.

use crate::error::Error;
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};
use core::fmt;

pub const FMMU_LEN: usize = 16;

/// ETG1000.4 Table 56 - Fieldbus memory management unit (FMMU) entity.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct Fmmu {
    /// Start address in octets in the logical memory area of the memory translation.
    pub logical_start_address: u32,
    pub length_bytes: u16,
    pub logical_start_bit: u8,
    pub logical_end_bit: u8,
    pub physical_start_address: u16,
    pub physical_start_bit: u8,
    pub read_enable: bool,
    pub write_enable: bool,
    pub enable: bool,
}

impl WireRead for Fmmu {
    const PACKED_LEN: usize = FMMU_LEN;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < FMMU_LEN {
            return Err(Error::Pdu(crate::error::PduError::Decode));
        }

        let byte11 = u16::from(buf[11]);

        Ok(Self {
            logical_start_address: u32::unpack_from_slice(&buf[0..4])?,
            length_bytes: u16::unpack_from_slice(&buf[4..6])?,
            logical_start_bit: buf[6] & 0x07,
            logical_end_bit: buf[7] & 0x07,
            physical_start_address: u16::unpack_from_slice(&buf[8..10])?,
            physical_start_bit: buf[10] & 0x07,
            read_enable: read_bits_u16(byte11, 0, 1) != 0,
            write_enable: read_bits_u16(byte11, 1, 1) != 0,
            enable: buf[12] & 0x01 != 0,
        })
    }
}

impl WireWrite for Fmmu {
    fn packed_len(&self) -> usize {
        FMMU_LEN
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], Error> {
        if buf.len() < FMMU_LEN {
            return Err(Error::Pdu(crate::error::PduError::TooLong));
        }

        buf[..FMMU_LEN].fill(0);

        self.logical_start_address.pack_to_slice(&mut buf[0..4])?;
        self.length_bytes.pack_to_slice(&mut buf[4..6])?;
        buf[6] = self.logical_start_bit & 0x07;
        buf[7] = self.logical_end_bit & 0x07;
        self.physical_start_address.pack_to_slice(&mut buf[8..10])?;
        buf[10] = self.physical_start_bit & 0x07;

        let mut byte11 = write_bits_u16(0, 0, 1, self.read_enable as u16);
        byte11 = write_bits_u16(byte11, 1, 1, self.write_enable as u16);
        buf[11] = byte11 as u8;

        buf[12] = self.enable as u8;

        Ok(&buf[..FMMU_LEN])
    }
}

impl fmt::Debug for Fmmu {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fmmu")
            .field(
                "logical_start_address",
                &format_args!("{:#010x}", self.logical_start_address),
            )
            .field("length_bytes", &self.length_bytes)
            .field("logical_start_bit", &self.logical_start_bit)
            .field("logical_end_bit", &self.logical_end_bit)
            .field(
                "physical_start_address",
                &format_args!("{:#06x}", self.physical_start_address),
            )
            .field("physical_start_bit", &self.physical_start_bit)
            .field("read_enable", &self.read_enable)
            .field("write_enable", &self.write_enable)
            .field("enable", &self.enable)
            .finish()
    }
}

impl fmt::Display for Fmmu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "logical start {:#010x}:{}, size {}, logical end bit {}, physical start {:#06x}:{}, {}{}, {}",
            self.logical_start_address,
            self.logical_start_bit,
            self.length_bytes,
            self.logical_end_bit,
            self.physical_start_address,
            self.physical_start_bit,
            if self.read_enable { "R" } else { "" },
            if self.write_enable { "W" } else { "O" },
            if self.enable { "enabled" } else { "disabled" },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zero() {
        let mut buf = [0xffu8; FMMU_LEN];
        Fmmu::default().pack_to_slice(&mut buf).unwrap();
        assert_eq!(buf, [0u8; FMMU_LEN]);
    }

    #[test]
    fn decode_one() {
        let raw = [
            // Logical start address
            0x00, 0x00, 0x00, 0x00, //
            // Length
            0x01, 0x00, //
            // Logical start bit
            0x00, //
            // Logical end bit
            0x03, //
            // Physical start address
            0x00, 0x10, //
            // Physical start bit
            0x00, //
            // Read/write enable
            0x01, //
            // FMMU enable
            0x01, //
            // Padding
            0x00, 0x00, 0x00,
        ];

        let fmmu = Fmmu::unpack_from_slice(&raw).unwrap();

        assert_eq!(
            fmmu,
            Fmmu {
                logical_start_address: 0,
                length_bytes: 1,
                logical_start_bit: 0,
                logical_end_bit: 3,
                physical_start_address: 0x1000,
                physical_start_bit: 0,
                read_enable: true,
                write_enable: false,
                enable: true,
            }
        )
    }

    #[test]
    fn roundtrip() {
        let fmmu = Fmmu {
            logical_start_address: 0x1234,
            length_bytes: 4,
            logical_start_bit: 2,
            logical_end_bit: 5,
            physical_start_address: 0x0800,
            physical_start_bit: 1,
            read_enable: true,
            write_enable: true,
            enable: true,
        };

        let mut buf = [0u8; FMMU_LEN];
        fmmu.pack_to_slice(&mut buf).unwrap();

        assert_eq!(Fmmu::unpack_from_slice(&buf).unwrap(), fmmu);
    }
}
