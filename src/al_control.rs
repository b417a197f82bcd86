//! AL (application layer) state and the control/status register built from it.

use crate::error::Error;
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};

/// AL (application layer) state for a single slave.
///
/// Read from register `0x0130` ([`RegisterAddress::AlStatus`](crate::register::RegisterAddress::AlStatus)),
/// written (as a request) to `0x0120`. Defined in ETG1000.6 6.4.1, ETG1000.6 Table 9.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AlState {
    /// No state recorded/read/known.
    #[default]
    None,
    /// EtherCAT `INIT` state.
    Init,
    /// EtherCAT `PRE-OP` state.
    PreOp,
    /// EtherCAT `BOOT` state.
    Bootstrap,
    /// EtherCAT `SAFE-OP` state.
    SafeOp,
    /// EtherCAT `OP` state.
    Op,
    /// A combination of the above or an unrecognised value.
    Other(u8),
}

impl AlState {
    fn from_u8(raw: u8) -> Self {
        match raw & 0x0f {
            0x00 => Self::None,
            0x01 => Self::Init,
            0x02 => Self::PreOp,
            0x03 => Self::Bootstrap,
            0x04 => Self::SafeOp,
            0x08 => Self::Op,
            other => Self::Other(other),
        }
    }

    pub(crate) fn as_u8(&self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Init => 0x01,
            Self::PreOp => 0x02,
            Self::Bootstrap => 0x03,
            Self::SafeOp => 0x04,
            Self::Op => 0x08,
            Self::Other(raw) => *raw,
        }
    }
}

impl core::fmt::Display for AlState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Init => f.write_str("Init"),
            Self::PreOp => f.write_str("Pre-Operational"),
            Self::Bootstrap => f.write_str("Bootstrap"),
            Self::SafeOp => f.write_str("Safe-Operational"),
            Self::Op => f.write_str("Operational"),
            Self::Other(value) => write!(f, "Other({:#03x})", value),
        }
    }
}

/// The AL control/status word for an individual slave, ETG1000.6 Table 9.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AlControl {
    pub state: AlState,
    pub error: bool,
    pub id_request: bool,
}

impl AlControl {
    pub fn new(state: AlState) -> Self {
        Self {
            state,
            error: false,
            id_request: false,
        }
    }

    pub fn reset() -> Self {
        Self {
            state: AlState::Init,
            error: true,
            id_request: false,
        }
    }
}

impl WireRead for AlControl {
    const PACKED_LEN: usize = 2;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, Error> {
        let raw = u16::unpack_from_slice(buf)?;
        Ok(Self {
            state: AlState::from_u8(read_bits_u16(raw, 0, 4) as u8),
            error: read_bits_u16(raw, 4, 1) != 0,
            id_request: read_bits_u16(raw, 5, 1) != 0,
        })
    }
}

impl WireWrite for AlControl {
    fn packed_len(&self) -> usize {
        2
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], Error> {
        let mut raw = write_bits_u16(0, 0, 4, u16::from(self.state.as_u8()));
        raw = write_bits_u16(raw, 4, 1, self.error as u16);
        raw = write_bits_u16(raw, 5, 1, self.id_request as u16);
        raw.pack_to_slice(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn al_control_roundtrip() {
        let value = AlControl {
            state: AlState::SafeOp,
            error: true,
            id_request: false,
        };

        let mut buf = [0u8; 2];
        value.pack_to_slice(&mut buf).unwrap();
        assert_eq!(buf, [0x04 | 0x10, 0x00]);

        assert_eq!(AlControl::unpack_from_slice(&buf).unwrap(), value);
    }

    #[test]
    fn unpack_short_is_error() {
        assert!(AlControl::unpack_from_slice(&[0x04]).is_err());
    }
}
