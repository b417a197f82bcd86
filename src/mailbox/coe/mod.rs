//! CAN application protocol over EtherCAT: SDO upload/download headers and requests.

pub mod abort_code;

use crate::error::Error;
use crate::mailbox::{MailboxHeader, MailboxType, Priority};
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};

/// Defined in ETG1000.6 5.6.1 Table 29 - CoE elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CoeService {
    Emergency = 0x01,
    SdoRequest = 0x02,
    SdoResponse = 0x03,
    TxPdo = 0x04,
    RxPdo = 0x05,
    TxPdoRemoteRequest = 0x06,
    RxPdoRemoteRequest = 0x07,
    SdoInformation = 0x08,
}

impl CoeService {
    fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0x01 => Self::Emergency,
            0x02 => Self::SdoRequest,
            0x03 => Self::SdoResponse,
            0x04 => Self::TxPdo,
            0x05 => Self::RxPdo,
            0x06 => Self::TxPdoRemoteRequest,
            0x07 => Self::RxPdoRemoteRequest,
            0x08 => Self::SdoInformation,
            _ => return None,
        })
    }
}

/// 2-byte CoE header prefixing the SDO/PDO body within a mailbox payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoeHeader {
    pub service: CoeService,
}

pub const COE_HEADER_LEN: usize = 2;

impl CoeHeader {
    pub fn unpack(buf: &[u8]) -> Result<Self, Error> {
        let raw = u16::unpack_from_slice(buf)?;
        let service = read_bits_u16(raw, 12, 4) as u8;
        let service = CoeService::from_u8(service).ok_or(Error::Pdu(crate::error::PduError::Decode))?;
        Ok(Self { service })
    }

    pub fn pack(&self, buf: &mut [u8]) -> Result<(), Error> {
        let raw = write_bits_u16(0, 12, 4, self.service as u16);
        raw.pack_to_slice(buf)?;
        Ok(())
    }
}

/// Flags byte of the "initiate" (normal/expedited) SDO header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitSdoFlags {
    pub size_indicator: bool,
    pub expedited_transfer: bool,
    pub size: u8,
    pub complete_access: bool,
    pub command: u8,
}

impl InitSdoFlags {
    pub const DOWNLOAD_REQUEST: u8 = 0x01;
    pub const UPLOAD_REQUEST: u8 = 0x02;
    pub const ABORT_REQUEST: u8 = 0x04;

    fn unpack(byte: u8) -> Self {
        let raw = u16::from(byte);
        Self {
            size_indicator: read_bits_u16(raw, 0, 1) != 0,
            expedited_transfer: read_bits_u16(raw, 1, 1) != 0,
            size: read_bits_u16(raw, 2, 2) as u8,
            complete_access: read_bits_u16(raw, 4, 1) != 0,
            command: read_bits_u16(raw, 5, 3) as u8,
        }
    }

    fn pack(&self) -> u8 {
        let mut raw = write_bits_u16(0, 0, 1, self.size_indicator as u16);
        raw = write_bits_u16(raw, 1, 1, self.expedited_transfer as u16);
        raw = write_bits_u16(raw, 2, 2, u16::from(self.size));
        raw = write_bits_u16(raw, 4, 1, self.complete_access as u16);
        raw = write_bits_u16(raw, 5, 3, u16::from(self.command));
        raw as u8
    }
}

/// 4-byte "initiate" SDO header (ETG1000.6 Section 5.6.2.1.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitSdoHeader {
    pub flags: InitSdoFlags,
    pub index: u16,
    pub sub_index: u8,
}

pub const INIT_SDO_HEADER_LEN: usize = 4;

impl InitSdoHeader {
    pub fn unpack(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < INIT_SDO_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::Decode));
        }
        Ok(Self {
            flags: InitSdoFlags::unpack(buf[0]),
            index: u16::unpack_from_slice(&buf[1..3])?,
            sub_index: buf[3],
        })
    }

    pub fn pack(&self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() < INIT_SDO_HEADER_LEN {
            return Err(Error::Pdu(crate::error::PduError::TooLong));
        }
        buf[0] = self.flags.pack();
        self.index.pack_to_slice(&mut buf[1..3])?;
        buf[3] = self.sub_index;
        Ok(())
    }
}

/// 1-byte segmented-transfer SDO header (ETG1000.6 5.6.2.3.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentSdoHeader {
    pub is_last_segment: bool,
    pub segment_data_size: u8,
    pub toggle: bool,
    pub command: u8,
}

impl SegmentSdoHeader {
    pub const DOWNLOAD_SEGMENT_REQUEST: u8 = 0x00;
    pub const UPLOAD_SEGMENT_REQUEST: u8 = 0x03;

    pub fn unpack(byte: u8) -> Self {
        let raw = u16::from(byte);
        Self {
            is_last_segment: read_bits_u16(raw, 0, 1) != 0,
            segment_data_size: read_bits_u16(raw, 1, 3) as u8,
            toggle: read_bits_u16(raw, 4, 1) != 0,
            command: read_bits_u16(raw, 5, 3) as u8,
        }
    }

    pub fn pack(&self) -> u8 {
        let mut raw = write_bits_u16(0, 0, 1, self.is_last_segment as u16);
        raw = write_bits_u16(raw, 1, 3, u16::from(self.segment_data_size));
        raw = write_bits_u16(raw, 4, 1, self.toggle as u16);
        raw = write_bits_u16(raw, 5, 3, u16::from(self.command));
        raw as u8
    }
}

/// Subindex access mode for an SDO transfer.
#[derive(Copy, Clone, Debug)]
pub enum SubIndex {
    /// Complete access: the entry is transferred as a single slice of data.
    Complete,
    /// Individual sub-index access.
    Index(u8),
}

impl SubIndex {
    pub(crate) fn complete_access(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub(crate) fn sub_index(&self) -> u8 {
        match self {
            // 0th sub-index counts number of sub-indices in object, so start from 1.
            SubIndex::Complete => 1,
            SubIndex::Index(idx) => *idx,
        }
    }
}

impl From<u8> for SubIndex {
    fn from(value: u8) -> Self {
        Self::Index(value)
    }
}

/// Build the 10-byte mailbox+CoE+SDO header common to every normal/expedited SDO request.
fn sdo_request_header(counter: u8) -> MailboxHeader {
    MailboxHeader {
        length: 0x0a,
        address: 0x0000,
        priority: Priority::Lowest as u8,
        mailbox_type: MailboxType::Coe,
        counter,
    }
}

/// An expedited (payload embedded in the SDO header) download request: 10 bytes header + 4 bytes
/// data.
pub fn download_expedited(counter: u8, index: u16, access: SubIndex, data: [u8; 4], len: u8) -> [u8; 14] {
    let mut buf = [0u8; 14];

    let _ = sdo_request_header(counter).pack(&mut buf[0..6]);
    let _ = CoeHeader {
        service: CoeService::SdoRequest,
    }
    .pack(&mut buf[6..8]);

    let header = InitSdoHeader {
        flags: InitSdoFlags {
            size_indicator: true,
            expedited_transfer: true,
            size: 4u8.saturating_sub(len),
            complete_access: access.complete_access(),
            command: InitSdoFlags::DOWNLOAD_REQUEST,
        },
        index,
        sub_index: access.sub_index(),
    };
    let _ = header.pack(&mut buf[8..12]);

    buf[12..14].copy_from_slice(&data[..2]);
    buf
}

/// A normal (unsegmented) SDO upload request: 10 bytes, no payload.
pub fn upload(counter: u8, index: u16, access: SubIndex) -> [u8; 10] {
    let mut buf = [0u8; 10];

    let _ = sdo_request_header(counter).pack(&mut buf[0..6]);
    let _ = CoeHeader {
        service: CoeService::SdoRequest,
    }
    .pack(&mut buf[6..8]);

    let header = InitSdoHeader {
        flags: InitSdoFlags {
            size_indicator: false,
            expedited_transfer: false,
            size: 0,
            complete_access: access.complete_access(),
            command: InitSdoFlags::UPLOAD_REQUEST,
        },
        index,
        sub_index: access.sub_index(),
    };
    let _ = header.pack(&mut buf[8..10]);

    buf
}

/// A normal (segmented) SDO download initiation: announces the complete transfer size without
/// carrying any data, which follows in subsequent [`download_segment`] frames.
pub const DOWNLOAD_NORMAL_LEN: usize = 16;

pub fn download_normal(counter: u8, index: u16, access: SubIndex, total_len: u32) -> [u8; DOWNLOAD_NORMAL_LEN] {
    let mut buf = [0u8; DOWNLOAD_NORMAL_LEN];

    let _ = sdo_request_header(counter).pack(&mut buf[0..6]);
    let _ = CoeHeader {
        service: CoeService::SdoRequest,
    }
    .pack(&mut buf[6..8]);

    let header = InitSdoHeader {
        flags: InitSdoFlags {
            size_indicator: true,
            expedited_transfer: false,
            size: 0,
            complete_access: access.complete_access(),
            command: InitSdoFlags::DOWNLOAD_REQUEST,
        },
        index,
        sub_index: access.sub_index(),
    };
    let _ = header.pack(&mut buf[8..12]);

    let _ = total_len.pack_to_slice(&mut buf[12..16]);
    buf
}

/// A download-segment request carrying up to 7 bytes of `data`. Returns the frame and its used
/// length (the 16-byte buffer is padded beyond that for callers who want a fixed-size write).
pub fn download_segment(counter: u8, toggle: bool, is_last: bool, data: &[u8]) -> ([u8; 16], usize) {
    let mut buf = [0u8; 16];
    let n = data.len().min(7);

    let _ = sdo_request_header(counter).pack(&mut buf[0..6]);
    let _ = CoeHeader {
        service: CoeService::SdoRequest,
    }
    .pack(&mut buf[6..8]);

    buf[8] = SegmentSdoHeader {
        is_last_segment: is_last,
        segment_data_size: (7 - n) as u8,
        toggle,
        command: SegmentSdoHeader::DOWNLOAD_SEGMENT_REQUEST,
    }
    .pack();
    buf[9..9 + n].copy_from_slice(&data[..n]);

    (buf, 9 + n)
}

/// An upload-segment request for the continuation of a segmented SDO upload.
pub fn upload_segmented(counter: u8, toggle: bool) -> [u8; 9] {
    let mut buf = [0u8; 9];

    let _ = sdo_request_header(counter).pack(&mut buf[0..6]);
    let _ = CoeHeader {
        service: CoeService::SdoRequest,
    }
    .pack(&mut buf[6..8]);

    buf[8] = SegmentSdoHeader {
        is_last_segment: false,
        segment_data_size: 0,
        toggle,
        command: SegmentSdoHeader::UPLOAD_SEGMENT_REQUEST,
    }
    .pack();

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coe_header_roundtrip() {
        let header = CoeHeader {
            service: CoeService::SdoResponse,
        };
        let mut buf = [0u8; COE_HEADER_LEN];
        header.pack(&mut buf).unwrap();
        assert_eq!(CoeHeader::unpack(&buf).unwrap(), header);
    }

    #[test]
    fn init_sdo_header_roundtrip() {
        let header = InitSdoHeader {
            flags: InitSdoFlags {
                size_indicator: true,
                expedited_transfer: true,
                size: 2,
                complete_access: false,
                command: InitSdoFlags::UPLOAD_REQUEST,
            },
            index: 0x6041,
            sub_index: 0,
        };
        let mut buf = [0u8; INIT_SDO_HEADER_LEN];
        header.pack(&mut buf).unwrap();
        assert_eq!(InitSdoHeader::unpack(&buf).unwrap(), header);
    }

    #[test]
    fn upload_request_targets_index() {
        let req = upload(3, 0x1018, SubIndex::Index(1));
        let header = InitSdoHeader::unpack(&req[8..12]).unwrap();
        assert_eq!(header.index, 0x1018);
        assert_eq!(header.sub_index, 1);
        assert_eq!(header.flags.command, InitSdoFlags::UPLOAD_REQUEST);
    }

    #[test]
    fn download_normal_announces_size() {
        let req = download_normal(1, 0x1f10, SubIndex::Index(1), 20);
        let header = InitSdoHeader::unpack(&req[8..12]).unwrap();
        assert!(!header.flags.expedited_transfer);
        assert!(header.flags.size_indicator);
        assert_eq!(u32::unpack_from_slice(&req[12..16]).unwrap(), 20);
    }

    #[test]
    fn download_segment_packs_up_to_seven_bytes() {
        let (buf, len) = download_segment(1, true, true, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(len, 16);
        let seg = SegmentSdoHeader::unpack(buf[8]);
        assert_eq!(seg.segment_data_size, 0);
        assert!(seg.toggle);
        assert_eq!(&buf[9..16], &[1, 2, 3, 4, 5, 6, 7]);
    }
}
