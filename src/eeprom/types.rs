//! Slave Information Interface (SII) wire types.

use crate::sync_manager_channel;
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};
use core::fmt;

pub const TX_PDO_RANGE: core::ops::RangeInclusive<u16> = 0x1A00..=0x1bff;
pub const RX_PDO_RANGE: core::ops::RangeInclusive<u16> = 0x1600..=0x17ff;

/// Defined in ETG1000.4 6.4.2
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SiiAccessConfig {
    pub access_pdi: bool,
    pub owner: SiiOwner,
    pub lock: bool,
}

impl WireRead for SiiAccessConfig {
    const PACKED_LEN: usize = 2;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, crate::error::Error> {
        let raw = u16::unpack_from_slice(buf)?;
        Ok(Self {
            access_pdi: read_bits_u16(raw, 0, 1) != 0,
            owner: SiiOwner::from_u8(read_bits_u16(raw, 8, 1) as u8),
            lock: read_bits_u16(raw, 9, 1) != 0,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SiiOwner {
    /// EEPROM access rights are assigned to PDI during state change from Init to PreOp, Init to
    /// Boot and while in Boot
    #[default]
    Dl,
    /// EEPROM access rights are assigned to PDI in all states except Init
    Pdi,
}

impl SiiOwner {
    fn from_u8(raw: u8) -> Self {
        if raw & 0x01 != 0 {
            Self::Pdi
        } else {
            Self::Dl
        }
    }
}

/// Defined in ETG1000.4 6.4.3
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SiiControl {
    pub access: SiiAccess,
    pub emulate_sii: bool,
    pub read_size: SiiReadSize,
    pub address_type: SiiAddressSize,
    pub read: bool,
    pub write: bool,
    pub reload: bool,
    pub checksum_error: bool,
    pub device_info_error: bool,
    pub command_error: bool,
    pub write_error: bool,
    pub busy: bool,
}

impl SiiControl {
    pub fn has_error(&self) -> bool {
        self.checksum_error || self.device_info_error || self.command_error || self.write_error
    }

    pub fn error_reset(self) -> Self {
        Self {
            checksum_error: false,
            device_info_error: false,
            command_error: false,
            write_error: false,
            ..self
        }
    }

    fn read() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }

    pub fn as_array(&self) -> [u8; 2] {
        let mut buf = [0u8; 2];
        let _ = self.pack_to_slice(&mut buf);
        buf
    }
}

impl WireRead for SiiControl {
    const PACKED_LEN: usize = 2;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, crate::error::Error> {
        let raw = u16::unpack_from_slice(buf)?;

        Ok(Self {
            access: SiiAccess::from_u8(read_bits_u16(raw, 8, 1) as u8),
            emulate_sii: read_bits_u16(raw, 13, 1) != 0,
            read_size: SiiReadSize::from_u8(read_bits_u16(raw, 14, 1) as u8),
            address_type: SiiAddressSize::from_u8(read_bits_u16(raw, 15, 1) as u8),
            read: read_bits_u16(raw, 0, 1) != 0,
            write: read_bits_u16(raw, 1, 1) != 0,
            reload: read_bits_u16(raw, 2, 1) != 0,
            checksum_error: read_bits_u16(raw, 3, 1) != 0,
            device_info_error: read_bits_u16(raw, 4, 1) != 0,
            command_error: read_bits_u16(raw, 5, 1) != 0,
            write_error: read_bits_u16(raw, 6, 1) != 0,
            busy: read_bits_u16(raw, 7, 1) != 0,
        })
    }
}

impl WireWrite for SiiControl {
    fn packed_len(&self) -> usize {
        2
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], crate::error::Error> {
        let mut raw = write_bits_u16(0, 8, 1, u16::from(self.access.as_u8()));
        raw = write_bits_u16(raw, 13, 1, self.emulate_sii as u16);
        raw = write_bits_u16(raw, 14, 1, u16::from(self.read_size.as_u8()));
        raw = write_bits_u16(raw, 15, 1, u16::from(self.address_type.as_u8()));
        raw = write_bits_u16(raw, 0, 1, self.read as u16);
        raw = write_bits_u16(raw, 1, 1, self.write as u16);
        raw = write_bits_u16(raw, 2, 1, self.reload as u16);
        raw = write_bits_u16(raw, 3, 1, self.checksum_error as u16);
        raw = write_bits_u16(raw, 4, 1, self.device_info_error as u16);
        raw = write_bits_u16(raw, 5, 1, self.command_error as u16);
        raw = write_bits_u16(raw, 6, 1, self.write_error as u16);
        raw = write_bits_u16(raw, 7, 1, self.busy as u16);
        raw.pack_to_slice(buf)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SiiAccess {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl SiiAccess {
    fn from_u8(raw: u8) -> Self {
        if raw & 0x01 != 0 {
            Self::ReadWrite
        } else {
            Self::ReadOnly
        }
    }

    fn as_u8(&self) -> u8 {
        match self {
            Self::ReadOnly => 0,
            Self::ReadWrite => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SiiReadSize {
    /// Read 4 octets at a time.
    #[default]
    Octets4,
    /// Read 8 octets at a time.
    Octets8,
}

impl SiiReadSize {
    fn from_u8(raw: u8) -> Self {
        if raw & 0x01 != 0 {
            Self::Octets8
        } else {
            Self::Octets4
        }
    }

    fn as_u8(&self) -> u8 {
        match self {
            Self::Octets4 => 0,
            Self::Octets8 => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SiiAddressSize {
    #[default]
    U8,
    U16,
}

impl SiiAddressSize {
    fn from_u8(raw: u8) -> Self {
        if raw & 0x01 != 0 {
            Self::U16
        } else {
            Self::U8
        }
    }

    fn as_u8(&self) -> u8 {
        match self {
            Self::U8 => 0,
            Self::U16 => 1,
        }
    }
}

pub struct SiiRequest {
    control: SiiControl,
    address: u16,
}

impl fmt::Debug for SiiRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SiiRequest")
            .field("control", &self.control)
            .field("address", &format_args!("{:#06x}", self.address))
            .finish()
    }
}

impl SiiRequest {
    pub fn read(address: u16) -> Self {
        Self {
            control: SiiControl::read(),
            address,
        }
    }

    pub fn as_array(&self) -> [u8; 6] {
        let mut buf = [0u8; 6];

        let _ = self.control.pack_to_slice(&mut buf[0..2]);

        buf[2..4].copy_from_slice(&self.address.to_le_bytes());
        buf[4..6].copy_from_slice(&[0, 0]);

        buf
    }
}

/// Defined in ETG1000.6 Table 17
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiiCategory {
    pub category: CategoryType,
    pub start: u16,
    /// Category length in words (`u16`)
    pub len_words: u16,
}

/// Defined in ETG1000.6 Table 19
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CategoryType {
    Nop,
    DeviceSpecific,
    Strings,
    DataTypes,
    General,
    Fmmu,
    SyncManager,
    FmmuExtended,
    SyncUnit,
    TxPdo,
    RxPdo,
    DistributedClock,
    End,
    Unknown(u16),
}

impl From<u16> for CategoryType {
    fn from(raw: u16) -> Self {
        match raw {
            0 => Self::Nop,
            1..=9 => Self::DeviceSpecific,
            10 => Self::Strings,
            20 => Self::DataTypes,
            30 => Self::General,
            40 => Self::Fmmu,
            41 => Self::SyncManager,
            42 => Self::FmmuExtended,
            43 => Self::SyncUnit,
            50 => Self::TxPdo,
            51 => Self::RxPdo,
            60 => Self::DistributedClock,
            0xffff => Self::End,
            other => Self::Unknown(other),
        }
    }
}

/// ETG1000.6 Table 23
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FmmuUsage {
    Unused,
    Outputs,
    Inputs,
    SyncManagerStatus,
    Unknown(u8),
}

impl From<u8> for FmmuUsage {
    fn from(raw: u8) -> Self {
        match raw {
            0x00 | 0xff => Self::Unused,
            0x01 => Self::Outputs,
            0x02 => Self::Inputs,
            0x03 => Self::SyncManagerStatus,
            other => Self::Unknown(other),
        }
    }
}

/// ETG1020 Table 10 "FMMU_EX" - extended FMMU descriptor in the EEPROM, distinct from the live
/// register layout in [`crate::fmmu::Fmmu`].
#[derive(Debug, Copy, Clone)]
pub struct FmmuEx {
    pub sync_manager: u8,
}

impl FmmuEx {
    pub fn parse(raw: &[u8; 3]) -> Self {
        Self {
            sync_manager: raw[1],
        }
    }
}

/// SII "General" category, defined in ETG1000.6 Table 21.
#[derive(Debug, PartialEq, Eq)]
pub struct SiiGeneral {
    pub name_string_idx: u8,
    pub coe_details: CoeDetails,
    pub foe_enabled: bool,
    pub eoe_enabled: bool,
    pub flags: Flags,
    pub ebus_current: i16,
    pub ports: [PortStatus; 4],
}

impl SiiGeneral {
    pub const LEN: usize = 16;

    pub fn parse(buf: &[u8]) -> Result<Self, crate::error::Error> {
        if buf.len() < Self::LEN {
            return Err(crate::error::Error::Eeprom(crate::error::EepromError::Decode));
        }

        let coe_details =
            CoeDetails::from_bits_truncate(buf[5]);
        let foe_enabled = buf[6] != 0;
        let eoe_enabled = buf[7] != 0;
        let flags = Flags::from_bits_truncate(buf[11]);
        let ebus_current = i16::from_le_bytes([buf[12], buf[13]]);
        let raw = u16::from_le_bytes([buf[14], buf[15]]);

        let ports = [
            PortStatus::from(((raw) & 0x0f) as u8),
            PortStatus::from(((raw >> 4) & 0x0f) as u8),
            PortStatus::from(((raw >> 8) & 0x0f) as u8),
            PortStatus::from(((raw >> 12) & 0x0f) as u8),
        ];

        Ok(Self {
            name_string_idx: buf[3],
            coe_details,
            foe_enabled,
            eoe_enabled,
            flags,
            ebus_current,
            ports,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PortStatus {
    Unused,
    Mii,
    Reserved,
    Ebus,
    FastHotConnect,
}

impl From<u8> for PortStatus {
    fn from(raw: u8) -> Self {
        match raw {
            0x01 => Self::Mii,
            0x02 => Self::Reserved,
            0x03 => Self::Ebus,
            0x04 => Self::FastHotConnect,
            _ => Self::Unused,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Flags: u8 {
        const ENABLE_SAFE_OP = 0x01;
        const ENABLE_NOT_LRW = 0x02;
        const MAILBOX_DLL = 0x04;
        const IDENT_AL_STATUS = 0x08;
        const IDENT_PHY_M = 0x10;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct CoeDetails: u8 {
        /// Bit 0: Enable SDO
        const ENABLE_SDO = 0x01;
        /// Bit 1: Enable SDO Info
        const ENABLE_SDO_INFO = 0x02;
        /// Bit 2: Enable PDO Assign
        const ENABLE_PDO_ASSIGN = 0x04;
        /// Bit 3: Enable PDO Configuration
        const ENABLE_PDO_CONFIG = 0x08;
        /// Bit 4: Enable Upload at startup
        const ENABLE_STARTUP_UPLOAD = 0x10;
        /// Bit 5: Enable SDO complete access
        const ENABLE_COMPLETE_ACCESS = 0x20;
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct SyncManager {
    pub start_addr: u16,
    pub length: u16,
    pub control: sync_manager_channel::Control,
    pub enable: SyncManagerEnable,
    pub usage_type: SyncManagerType,
}

impl fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncManager")
            .field("start_addr", &format_args!("{:#06x}", self.start_addr))
            .field("length", &format_args!("{:#06x}", self.length))
            .field("control", &self.control)
            .field("enable", &self.enable)
            .field("usage_type", &self.usage_type)
            .finish()
    }
}

impl SyncManager {
    pub const LEN: usize = 8;

    pub fn parse(buf: &[u8]) -> Result<Self, crate::error::Error> {
        if buf.len() < Self::LEN {
            return Err(crate::error::Error::Eeprom(crate::error::EepromError::Decode));
        }

        let start_addr = u16::from_le_bytes([buf[0], buf[1]]);
        let length = u16::from_le_bytes([buf[2], buf[3]]);
        let control = sync_manager_channel::Control::unpack_from_slice(&buf[4..5])?;
        let enable = SyncManagerEnable::from_bits_truncate(buf[6]);
        let usage_type = SyncManagerType::from(buf[7]);

        Ok(Self {
            start_addr,
            length,
            control,
            enable,
            usage_type,
        })
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct SyncManagerEnable: u8 {
        /// Bit 0: enable.
        const ENABLE = 0x01;
        /// Bit 1: fixed content (info for config tool – SyncMan has fixed content).
        const IS_FIXED = 0x02;
        /// Bit 2: virtual SyncManager (virtual SyncMan - no hardware resource used).
        const IS_VIRTUAL = 0x04;
        /// Bit 3: opOnly (SyncMan should be enabled only in OP state).
        const OP_ONLY = 0x08;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SyncManagerType {
    /// Not used or unknown.
    #[default]
    Unknown,
    /// Used for mailbox out.
    MailboxOut,
    /// Used for mailbox in.
    MailboxIn,
    /// Used for process data outputs from master.
    ProcessDataWrite,
    /// Used for process data inputs to master.
    ProcessDataRead,
}

impl From<u8> for SyncManagerType {
    fn from(raw: u8) -> Self {
        match raw {
            0x01 => Self::MailboxOut,
            0x02 => Self::MailboxIn,
            0x03 => Self::ProcessDataWrite,
            0x04 => Self::ProcessDataRead,
            _ => Self::Unknown,
        }
    }
}

/// Defined in ETG2010 Table 14 - structure category TXPDO and RXPDO for each PDO.
#[derive(Clone)]
pub struct Pdo {
    pub index: u16,
    pub num_entries: u8,
    pub sync_manager: u8,
    dc_sync: u8,
    name_string_idx: u8,
    flags: PdoFlags,
    pub entries: heapless::Vec<PdoEntry, 16>,
}

impl fmt::Debug for Pdo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pdo")
            .field("index", &format_args!("{:#06x}", self.index))
            .field("num_entries", &self.num_entries)
            .field("sync_manager", &self.sync_manager)
            .field("dc_sync", &self.dc_sync)
            .field("name_string_idx", &self.name_string_idx)
            .field("flags", &self.flags)
            .field("entries", &self.entries)
            .finish()
    }
}

impl Pdo {
    pub const HEADER_LEN: usize = 8;

    pub fn parse(buf: &[u8]) -> Result<Self, crate::error::Error> {
        if buf.len() < Self::HEADER_LEN {
            return Err(crate::error::Error::Eeprom(crate::error::EepromError::Decode));
        }

        Ok(Self {
            index: u16::from_le_bytes([buf[0], buf[1]]),
            num_entries: buf[2],
            sync_manager: buf[3],
            dc_sync: buf[4],
            name_string_idx: buf[5],
            flags: PdoFlags::from_bits_truncate(u16::from_le_bytes([buf[6], buf[7]])),
            entries: heapless::Vec::new(),
        })
    }

    /// Compute the total bit length of this PDO by summing each entry's bit length.
    pub fn bit_len(&self) -> u16 {
        self.entries
            .iter()
            .map(|entry| u16::from(entry.data_length_bits))
            .sum()
    }
}

#[derive(Clone)]
pub struct PdoEntry {
    pub index: u16,
    pub sub_index: u8,
    name_string_idx: u8,
    data_type: crate::base_data_types::PrimitiveDataType,
    pub data_length_bits: u8,
    flags: u16,
}

impl fmt::Debug for PdoEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PdoEntry")
            .field("index", &format_args!("{:#06x}", self.index))
            .field("sub_index", &self.sub_index)
            .field("name_string_idx", &self.name_string_idx)
            .field("data_type", &self.data_type)
            .field("data_length_bits", &self.data_length_bits)
            .field("flags", &self.flags)
            .finish()
    }
}

impl PdoEntry {
    pub const LEN: usize = 8;

    pub fn parse(buf: &[u8]) -> Result<Self, crate::error::Error> {
        if buf.len() < Self::LEN {
            return Err(crate::error::Error::Eeprom(crate::error::EepromError::Decode));
        }

        Ok(Self {
            index: u16::from_le_bytes([buf[0], buf[1]]),
            sub_index: buf[2],
            name_string_idx: buf[3],
            data_type: crate::base_data_types::PrimitiveDataType::from(buf[4]),
            data_length_bits: buf[5],
            flags: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PdoFlags: u16 {
        const PDO_MANDATORY = 0x0001;
        const PDO_DEFAULT = 0x0002;
        const PDO_OVERSAMPLE = 0x0004;
        const PDO_FIXED_CONTENT = 0x0010;
        const PDO_VIRTUAL_CONTENT = 0x0020;
        const PDO_DOWNLOAD_ANYWAY = 0x0040;
        const PDO_FROM_MODULE = 0x0080;
        const PDO_MODULE_ALIGN = 0x0100;
        const PDO_DEPEND_ON_SLOT = 0x0200;
        const PDO_DEPEND_ON_SLOT_GROUP = 0x0400;
        const PDO_OVERWRITTEN_BY_MODULE = 0x0800;
        const PDO_CONFIGURABLE = 0x1000;
        const PDO_AUTO_PDO_NAME = 0x2000;
        const PDO_DIS_AUTO_EXCLUDE = 0x4000;
        const PDO_WRITABLE = 0x8000;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct MailboxProtocols: u16 {
        const AOE = 0x0001;
        const EOE = 0x0002;
        const COE = 0x0004;
        const FOE = 0x0008;
        const SOE = 0x0010;
        const VOE = 0x0020;
    }
}

#[derive(Clone)]
pub struct MailboxConfig {
    pub receive_offset: u16,
    pub receive_size: u16,
    pub send_offset: u16,
    pub send_size: u16,
    pub protocol: MailboxProtocols,
}

impl fmt::Debug for MailboxConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MailboxConfig")
            .field("receive_offset", &format_args!("{:#06x}", self.receive_offset))
            .field("receive_size", &format_args!("{:#06x}", self.receive_size))
            .field("send_offset", &format_args!("{:#06x}", self.send_offset))
            .field("send_size", &format_args!("{:#06x}", self.send_size))
            .field("protocol", &self.protocol)
            .finish()
    }
}

impl MailboxConfig {
    pub const LEN: usize = 10;

    pub fn parse(buf: &[u8]) -> Result<Self, crate::error::Error> {
        if buf.len() < Self::LEN {
            return Err(crate::error::Error::Eeprom(crate::error::EepromError::Decode));
        }

        Ok(Self {
            receive_offset: u16::from_le_bytes([buf[0], buf[1]]),
            receive_size: u16::from_le_bytes([buf[2], buf[3]]),
            send_offset: u16::from_le_bytes([buf[4], buf[5]]),
            send_size: u16::from_le_bytes([buf[6], buf[7]]),
            protocol: MailboxProtocols::from_bits_truncate(u16::from_le_bytes([buf[8], buf[9]])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sii_control_roundtrip() {
        let ctl = SiiControl {
            read: true,
            read_size: SiiReadSize::Octets8,
            ..Default::default()
        };

        let buf = ctl.as_array();
        assert_eq!(SiiControl::unpack_from_slice(&buf).unwrap(), ctl);
    }

    #[test]
    fn category_from_device_specific_range() {
        assert_eq!(CategoryType::from(5), CategoryType::DeviceSpecific);
        assert_eq!(CategoryType::from(0xffff), CategoryType::End);
    }

    #[test]
    fn sync_manager_parse() {
        let raw = [0x00, 0x10, 0x80, 0x00, 0x26, 0x00, 0x01, 0x03];
        let sm = SyncManager::parse(&raw).unwrap();
        assert_eq!(sm.start_addr, 0x1000);
        assert_eq!(sm.usage_type, SyncManagerType::ProcessDataWrite);
    }
}
