//! Raw EtherCAT datagram commands, e.g. `LRW`, `BRD`, `APWR`, etc.

use crate::error::{Error, PduError};
use crate::wire::{WireRead, WireWrite};

const NOP: u8 = 0x00;
const APRD: u8 = 0x01;
const APWR: u8 = 0x02;
const FPRD: u8 = 0x04;
const FPWR: u8 = 0x05;
const BWR: u8 = 0x08;
const BRD: u8 = 0x07;
const LRD: u8 = 0x0A;
const LWR: u8 = 0x0B;
const LRW: u8 = 0x0C;
const FRMW: u8 = 0x0E;

/// Datagram command.
///
/// All addressing is pre-resolved into the on-wire 16 or 32 bit address field; `address()` and
/// `code()` give the raw header values `frame.rs` needs when packing a datagram.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Command {
    /// No operation.
    #[default]
    Nop,
    /// Auto-increment physical read.
    Aprd {
        /// Auto-increment counter, negated so addressing walks the ring.
        address: u16,
        /// Memory location to read from.
        register: u16,
    },
    /// Auto-increment physical write.
    Apwr {
        /// Auto-increment counter, negated so addressing walks the ring.
        address: u16,
        /// Memory location to write to.
        register: u16,
    },
    /// Fixed-address physical read.
    Fprd {
        /// Configured station address.
        address: u16,
        /// Memory location to read from.
        register: u16,
    },
    /// Fixed-address physical write.
    Fpwr {
        /// Configured station address.
        address: u16,
        /// Memory location to write to.
        register: u16,
    },
    /// Broadcast read.
    Brd {
        /// Always zero when sent by the master.
        address: u16,
        /// Memory location to read from.
        register: u16,
    },
    /// Broadcast write.
    Bwr {
        /// Always zero when sent by the master.
        address: u16,
        /// Memory location to write to.
        register: u16,
    },
    /// Configured-address read, multiple write. Used to distribute a value around the ring.
    Frmw {
        /// Configured station address.
        address: u16,
        /// Memory location to read from.
        register: u16,
    },
    /// Logical read.
    Lrd {
        /// Logical address.
        address: u32,
    },
    /// Logical write.
    Lwr {
        /// Logical address.
        address: u32,
    },
    /// Logical read/write. Used for process data exchange.
    Lrw {
        /// Logical address.
        address: u32,
    },
}

impl Command {
    /// Auto-increment physical read at ring position `position` (0-based).
    pub fn aprd(position: u16, register: u16) -> Self {
        Self::Aprd {
            address: 0u16.wrapping_sub(position),
            register,
        }
    }

    /// Auto-increment physical write at ring position `position` (0-based).
    pub fn apwr(position: u16, register: u16) -> Self {
        Self::Apwr {
            address: 0u16.wrapping_sub(position),
            register,
        }
    }

    /// Fixed-address physical read.
    pub fn fprd(address: u16, register: u16) -> Self {
        Self::Fprd { address, register }
    }

    /// Fixed-address physical write.
    pub fn fpwr(address: u16, register: u16) -> Self {
        Self::Fpwr { address, register }
    }

    /// Broadcast read.
    pub fn brd(register: u16) -> Self {
        Self::Brd {
            address: 0,
            register,
        }
    }

    /// Broadcast write.
    pub fn bwr(register: u16) -> Self {
        Self::Bwr {
            address: 0,
            register,
        }
    }

    /// Configured-address read, multiple write.
    pub fn frmw(address: u16, register: u16) -> Self {
        Self::Frmw { address, register }
    }

    /// Logical read.
    pub fn lrd(address: u32) -> Self {
        Self::Lrd { address }
    }

    /// Logical write.
    pub fn lwr(address: u32) -> Self {
        Self::Lwr { address }
    }

    /// Logical read/write, used for cyclic process data exchange.
    pub fn lrw(address: u32) -> Self {
        Self::Lrw { address }
    }

    /// Raw EtherCAT command opcode.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Nop => NOP,
            Self::Aprd { .. } => APRD,
            Self::Apwr { .. } => APWR,
            Self::Fprd { .. } => FPRD,
            Self::Fpwr { .. } => FPWR,
            Self::Brd { .. } => BRD,
            Self::Bwr { .. } => BWR,
            Self::Frmw { .. } => FRMW,
            Self::Lrd { .. } => LRD,
            Self::Lwr { .. } => LWR,
            Self::Lrw { .. } => LRW,
        }
    }

    /// Whether this command type expects a non-zero working counter contribution for every
    /// slave it addresses (broadcast/logical commands are excluded from some checks).
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::Lrd { .. } | Self::Lwr { .. } | Self::Lrw { .. })
    }

    /// Pack the 4-byte address field used in the datagram header.
    pub fn pack_address(&self, buf: &mut [u8; 4]) -> Result<(), Error> {
        match *self {
            Self::Nop => Ok(()),
            Self::Aprd { address, register }
            | Self::Apwr { address, register }
            | Self::Fprd { address, register }
            | Self::Fpwr { address, register }
            | Self::Brd { address, register }
            | Self::Bwr { address, register }
            | Self::Frmw { address, register } => {
                address.pack_to_slice(&mut buf[0..2])?;
                register.pack_to_slice(&mut buf[2..4])?;
                Ok(())
            }
            Self::Lrd { address } | Self::Lwr { address } | Self::Lrw { address } => {
                address.pack_to_slice(buf)?;
                Ok(())
            }
        }
    }

    /// Parse a command back from its opcode and raw 4-byte address field. Used by the receive
    /// path to validate that a reply matches what was sent.
    pub fn parse_code_address(code: u8, addr: [u8; 4]) -> Result<Self, Error> {
        let pair = || -> Result<(u16, u16), Error> {
            Ok((
                u16::unpack_from_slice(&addr[0..2])?,
                u16::unpack_from_slice(&addr[2..4])?,
            ))
        };

        Ok(match code {
            NOP => Self::Nop,
            APRD => {
                let (address, register) = pair()?;
                Self::Aprd { address, register }
            }
            APWR => {
                let (address, register) = pair()?;
                Self::Apwr { address, register }
            }
            FPRD => {
                let (address, register) = pair()?;
                Self::Fprd { address, register }
            }
            FPWR => {
                let (address, register) = pair()?;
                Self::Fpwr { address, register }
            }
            BRD => {
                let (address, register) = pair()?;
                Self::Brd { address, register }
            }
            BWR => {
                let (address, register) = pair()?;
                Self::Bwr { address, register }
            }
            FRMW => {
                let (address, register) = pair()?;
                Self::Frmw { address, register }
            }
            LRD => Self::Lrd {
                address: u32::unpack_from_slice(&addr)?,
            },
            LWR => Self::Lwr {
                address: u32::unpack_from_slice(&addr)?,
            },
            LRW => Self::Lrw {
                address: u32::unpack_from_slice(&addr)?,
            },
            other => return Err(Error::Pdu(PduError::InvalidIndex(other))),
        })
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Nop => write!(f, "NOP"),
            Self::Aprd { address, register } => {
                write!(f, "APRD(addr {:#06x}, reg {:#06x})", address, register)
            }
            Self::Apwr { address, register } => {
                write!(f, "APWR(addr {:#06x}, reg {:#06x})", address, register)
            }
            Self::Fprd { address, register } => {
                write!(f, "FPRD(addr {:#06x}, reg {:#06x})", address, register)
            }
            Self::Fpwr { address, register } => {
                write!(f, "FPWR(addr {:#06x}, reg {:#06x})", address, register)
            }
            Self::Brd { address, register } => {
                write!(f, "BRD(addr {:#06x}, reg {:#06x})", address, register)
            }
            Self::Bwr { address, register } => {
                write!(f, "BWR(addr {:#06x}, reg {:#06x})", address, register)
            }
            Self::Frmw { address, register } => {
                write!(f, "FRMW(addr {:#06x}, reg {:#06x})", address, register)
            }
            Self::Lrd { address } => write!(f, "LRD(addr {:#010x})", address),
            Self::Lwr { address } => write!(f, "LWR(addr {:#010x})", address),
            Self::Lrw { address } => write!(f, "LRW(addr {:#010x})", address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aprd_negates_position() {
        let Command::Aprd { address, .. } = Command::aprd(1, 0x10) else {
            panic!("wrong variant");
        };

        assert_eq!(address, 0xffff);
    }

    #[test]
    fn roundtrip_fprd() {
        let cmd = Command::fprd(0x1001, 0x0130);

        let mut buf = [0u8; 4];
        cmd.pack_address(&mut buf).unwrap();

        let parsed = Command::parse_code_address(cmd.code(), buf).unwrap();

        assert_eq!(parsed, cmd);
    }

    #[test]
    fn roundtrip_lrw() {
        let cmd = Command::lrw(0xdead_beef);

        let mut buf = [0u8; 4];
        cmd.pack_address(&mut buf).unwrap();

        assert_eq!(Command::parse_code_address(cmd.code(), buf).unwrap(), cmd);
    }
}
