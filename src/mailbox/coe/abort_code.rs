//! CoE SDO abort codes (ETG1000.6 Table 41).

use crate::error::Error;
use crate::wire::{WireRead, WireWrite};

/// An SDO abort code returned in place of a normal SDO response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u32)]
pub enum CoeAbortCode {
    /// Toggle bit not changed
    ToggleBit = 0x0503_0000,
    /// SDO protocol timeout
    SdoTimeout = 0x0504_0000,
    /// Client/Server command specifier not valid or unknown
    InvalidCommand = 0x0504_0001,
    /// Out of memory
    OutOfMemory = 0x0504_0005,
    /// Unsupported access to an object
    UnsupportedAccess = 0x0601_0000,
    /// Attempt to read a write only object
    WriteOnlyRead = 0x0601_0001,
    /// Attempt to write a read only object
    ReadOnlyWrite = 0x0601_0002,
    /// Subindex cannot be written, SI0 must be 0 for write access
    IndexOnly = 0x0601_0003,
    /// SDO Complete access not supported for objects of variable length
    NoCompleteAccess = 0x0601_0004,
    /// Object length exceeds mailbox size
    ObjectTooLarge = 0x0601_0005,
    /// Object mapped to RxPDO, SDO Download blocked
    DownloadBlocked = 0x0601_0006,
    /// The object does not exist in the object directory
    NotFound = 0x0602_0000,
    /// The object cannot be mapped into the PDO
    PdoMappingFailed = 0x0604_0041,
    /// The number and length of the objects to be mapped would exceed the PDO length
    PdoTooSmall = 0x0604_0042,
    /// General parameter incompatibility reason
    Incompatible = 0x0604_0043,
    /// General internal incompatibility in the device
    Internal = 0x0604_0047,
    /// Access failed due to a hardware error
    HardwareFailure = 0x0606_0000,
    /// Data type does not match, length of service parameter does not match
    DataLengthMismatch = 0x0607_0010,
    /// Data type does not match, length of service parameter too high
    DataTooLong = 0x0607_0012,
    /// Data type does not match, length of service parameter too low
    DataTooShort = 0x0607_0013,
    /// Subindex does not exist
    SubIndexNotFound = 0x0609_0011,
    /// Value range of parameter exceeded (only for write access)
    ValueOutOfRange = 0x0609_0030,
    /// Value of parameter written too high
    ValueTooLarge = 0x0609_0031,
    /// Value of parameter written too low
    ValueTooSmall = 0x0609_0032,
    /// Maximum value is less than minimum value
    MaxMin = 0x0609_0036,
    /// General error
    General = 0x0800_0000,
    /// Data cannot be transferred or stored to the application
    TransferFailed = 0x0800_0020,
    /// Data cannot be transferred or stored to the application because of local control
    TransferFailedLocal = 0x0800_0021,
    /// Data cannot be transferred or stored to the application because of the present device state
    InvalidState = 0x0800_0022,
    /// Object dictionary dynamic generation fails or no object dictionary is present
    NoObjectDictionary = 0x0800_0023,
    /// Unknown or vendor-specific abort code.
    Unknown(u32),
}

impl From<u32> for CoeAbortCode {
    fn from(raw: u32) -> Self {
        match raw {
            0x0503_0000 => Self::ToggleBit,
            0x0504_0000 => Self::SdoTimeout,
            0x0504_0001 => Self::InvalidCommand,
            0x0504_0005 => Self::OutOfMemory,
            0x0601_0000 => Self::UnsupportedAccess,
            0x0601_0001 => Self::WriteOnlyRead,
            0x0601_0002 => Self::ReadOnlyWrite,
            0x0601_0003 => Self::IndexOnly,
            0x0601_0004 => Self::NoCompleteAccess,
            0x0601_0005 => Self::ObjectTooLarge,
            0x0601_0006 => Self::DownloadBlocked,
            0x0602_0000 => Self::NotFound,
            0x0604_0041 => Self::PdoMappingFailed,
            0x0604_0042 => Self::PdoTooSmall,
            0x0604_0043 => Self::Incompatible,
            0x0604_0047 => Self::Internal,
            0x0606_0000 => Self::HardwareFailure,
            0x0607_0010 => Self::DataLengthMismatch,
            0x0607_0012 => Self::DataTooLong,
            0x0607_0013 => Self::DataTooShort,
            0x0609_0011 => Self::SubIndexNotFound,
            0x0609_0030 => Self::ValueOutOfRange,
            0x0609_0031 => Self::ValueTooLarge,
            0x0609_0032 => Self::ValueTooSmall,
            0x0609_0036 => Self::MaxMin,
            0x0800_0000 => Self::General,
            0x0800_0020 => Self::TransferFailed,
            0x0800_0021 => Self::TransferFailedLocal,
            0x0800_0022 => Self::InvalidState,
            0x0800_0023 => Self::NoObjectDictionary,
            other => Self::Unknown(other),
        }
    }
}

impl From<CoeAbortCode> for u32 {
    fn from(code: CoeAbortCode) -> Self {
        match code {
            CoeAbortCode::ToggleBit => 0x0503_0000,
            CoeAbortCode::SdoTimeout => 0x0504_0000,
            CoeAbortCode::InvalidCommand => 0x0504_0001,
            CoeAbortCode::OutOfMemory => 0x0504_0005,
            CoeAbortCode::UnsupportedAccess => 0x0601_0000,
            CoeAbortCode::WriteOnlyRead => 0x0601_0001,
            CoeAbortCode::ReadOnlyWrite => 0x0601_0002,
            CoeAbortCode::IndexOnly => 0x0601_0003,
            CoeAbortCode::NoCompleteAccess => 0x0601_0004,
            CoeAbortCode::ObjectTooLarge => 0x0601_0005,
            CoeAbortCode::DownloadBlocked => 0x0601_0006,
            CoeAbortCode::NotFound => 0x0602_0000,
            CoeAbortCode::PdoMappingFailed => 0x0604_0041,
            CoeAbortCode::PdoTooSmall => 0x0604_0042,
            CoeAbortCode::Incompatible => 0x0604_0043,
            CoeAbortCode::Internal => 0x0604_0047,
            CoeAbortCode::HardwareFailure => 0x0606_0000,
            CoeAbortCode::DataLengthMismatch => 0x0607_0010,
            CoeAbortCode::DataTooLong => 0x0607_0012,
            CoeAbortCode::DataTooShort => 0x0607_0013,
            CoeAbortCode::SubIndexNotFound => 0x0609_0011,
            CoeAbortCode::ValueOutOfRange => 0x0609_0030,
            CoeAbortCode::ValueTooLarge => 0x0609_0031,
            CoeAbortCode::ValueTooSmall => 0x0609_0032,
            CoeAbortCode::MaxMin => 0x0609_0036,
            CoeAbortCode::General => 0x0800_0000,
            CoeAbortCode::TransferFailed => 0x0800_0020,
            CoeAbortCode::TransferFailedLocal => 0x0800_0021,
            CoeAbortCode::InvalidState => 0x0800_0022,
            CoeAbortCode::NoObjectDictionary => 0x0800_0023,
            CoeAbortCode::Unknown(raw) => raw,
        }
    }
}

impl WireRead for CoeAbortCode {
    const PACKED_LEN: usize = 4;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, Error> {
        Ok(Self::from(u32::unpack_from_slice(buf)?))
    }
}

impl WireWrite for CoeAbortCode {
    fn packed_len(&self) -> usize {
        4
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], Error> {
        u32::from(*self).pack_to_slice(buf)
    }
}

impl core::fmt::Display for CoeAbortCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}: ", u32::from(*self))?;

        match self {
            Self::ToggleBit => f.write_str("toggle bit not changed"),
            Self::SdoTimeout => f.write_str("SDO protocol timeout"),
            Self::InvalidCommand => f.write_str("command specifier not valid or unknown"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::UnsupportedAccess => f.write_str("unsupported access to an object"),
            Self::WriteOnlyRead => f.write_str("attempt to read a write only object"),
            Self::ReadOnlyWrite => f.write_str("attempt to write a read only object"),
            Self::IndexOnly => f.write_str("subindex cannot be written, SI0 must be 0"),
            Self::NoCompleteAccess => f.write_str("complete access not supported for this object"),
            Self::ObjectTooLarge => f.write_str("object length exceeds mailbox size"),
            Self::DownloadBlocked => f.write_str("object mapped to RxPDO, download blocked"),
            Self::NotFound => f.write_str("object does not exist in the object directory"),
            Self::PdoMappingFailed => f.write_str("object cannot be mapped into the PDO"),
            Self::PdoTooSmall => f.write_str("mapped objects would exceed the PDO length"),
            Self::Incompatible => f.write_str("general parameter incompatibility"),
            Self::Internal => f.write_str("general internal incompatibility in the device"),
            Self::HardwareFailure => f.write_str("access failed due to a hardware error"),
            Self::DataLengthMismatch => f.write_str("service parameter length does not match"),
            Self::DataTooLong => f.write_str("service parameter length too high"),
            Self::DataTooShort => f.write_str("service parameter length too low"),
            Self::SubIndexNotFound => f.write_str("subindex does not exist"),
            Self::ValueOutOfRange => f.write_str("value range of parameter exceeded"),
            Self::ValueTooLarge => f.write_str("value of parameter written too high"),
            Self::ValueTooSmall => f.write_str("value of parameter written too low"),
            Self::MaxMin => f.write_str("maximum value is less than minimum value"),
            Self::General => f.write_str("general error"),
            Self::TransferFailed => f.write_str("data cannot be transferred or stored"),
            Self::TransferFailedLocal => f.write_str("transfer failed due to local control"),
            Self::InvalidState => f.write_str("transfer failed due to the present device state"),
            Self::NoObjectDictionary => f.write_str("no object dictionary is present"),
            Self::Unknown(_) => f.write_str("unknown abort code"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_code() {
        let decoded = CoeAbortCode::from(0x1234_5678u32);
        assert_eq!(decoded, CoeAbortCode::Unknown(0x1234_5678));
    }

    #[test]
    fn parse_code() {
        assert_eq!(CoeAbortCode::from(0x0609_0036), CoeAbortCode::MaxMin);
    }

    #[test]
    fn roundtrip() {
        let mut buf = [0u8; 4];
        CoeAbortCode::NotFound.pack_to_slice(&mut buf).unwrap();
        assert_eq!(CoeAbortCode::unpack_from_slice(&buf).unwrap(), CoeAbortCode::NotFound);
    }
}
