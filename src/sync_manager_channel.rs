use crate::error::Error;
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};
use core::fmt;

/// ETG1000.6 Table 67 – CoE Communication Area, "Sync Manager Communication Type".
pub const SM_TYPE_ADDRESS: u16 = 0x1c00;

/// ETG1000.6 Table 67 – CoE Communication Area, the address of the first sync manager.
pub const SM_BASE_ADDRESS: u16 = 0x1c10;

/// Sync manager channel.
///
/// Defined in ETG1000.4 6.7.2
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct SyncManagerChannel {
    pub physical_start_address: u16,
    pub length_bytes: u16,
    pub control: Control,
    pub status: Status,
    pub enable: Enable,
}

impl WireRead for SyncManagerChannel {
    const PACKED_LEN: usize = 8;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < Self::PACKED_LEN {
            return Err(Error::Pdu(crate::error::PduError::Decode));
        }

        Ok(Self {
            physical_start_address: u16::unpack_from_slice(&buf[0..2])?,
            length_bytes: u16::unpack_from_slice(&buf[2..4])?,
            control: Control::unpack_from_slice(&buf[4..5])?,
            status: Status::unpack_from_slice(&buf[5..6])?,
            enable: Enable::unpack_from_slice(&buf[6..8])?,
        })
    }
}

impl WireWrite for SyncManagerChannel {
    fn packed_len(&self) -> usize {
        8
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], Error> {
        if buf.len() < 8 {
            return Err(Error::Pdu(crate::error::PduError::TooLong));
        }

        self.physical_start_address.pack_to_slice(&mut buf[0..2])?;
        self.length_bytes.pack_to_slice(&mut buf[2..4])?;
        self.control.pack_to_slice(&mut buf[4..5])?;
        self.status.pack_to_slice(&mut buf[5..6])?;
        self.enable.pack_to_slice(&mut buf[6..8])?;

        Ok(&buf[..8])
    }
}

impl fmt::Debug for SyncManagerChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SyncManagerChannel")
            .field(
                "physical_start_address",
                &format_args!("{:#06x}", self.physical_start_address),
            )
            .field(
                "length_bytes",
                &format_args!("{:#06x} ({})", self.length_bytes, self.length_bytes),
            )
            .field("control", &self.control)
            .field("status", &self.status)
            .field("enable", &self.enable)
            .finish()
    }
}

impl fmt::Display for SyncManagerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "start {:#06x}, size {:#06x} ({}), direction {:?}, mode {:?}, {}",
            self.physical_start_address,
            self.length_bytes,
            self.length_bytes,
            self.control.direction,
            self.control.operation_mode,
            if self.enable.enable {
                "enabled"
            } else {
                "disabled"
            },
        ))
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Control {
    pub operation_mode: OperationMode,
    pub direction: Direction,
    pub ecat_event_enable: bool,
    pub dls_user_event_enable: bool,
    pub watchdog_enable: bool,
}

impl WireRead for Control {
    const PACKED_LEN: usize = 1;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, Error> {
        let raw = u16::from(u8::unpack_from_slice(buf)?);
        Ok(Self {
            operation_mode: OperationMode::from_u8(read_bits_u16(raw, 0, 2) as u8),
            direction: Direction::from_u8(read_bits_u16(raw, 2, 2) as u8),
            ecat_event_enable: read_bits_u16(raw, 4, 1) != 0,
            dls_user_event_enable: read_bits_u16(raw, 5, 1) != 0,
            watchdog_enable: read_bits_u16(raw, 6, 1) != 0,
        })
    }
}

impl WireWrite for Control {
    fn packed_len(&self) -> usize {
        1
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], Error> {
        let mut raw = write_bits_u16(0, 0, 2, u16::from(self.operation_mode.as_u8()));
        raw = write_bits_u16(raw, 2, 2, u16::from(self.direction.as_u8()));
        raw = write_bits_u16(raw, 4, 1, self.ecat_event_enable as u16);
        raw = write_bits_u16(raw, 5, 1, self.dls_user_event_enable as u16);
        raw = write_bits_u16(raw, 6, 1, self.watchdog_enable as u16);
        (raw as u8).pack_to_slice(buf)
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub has_write_event: bool,
    pub has_read_event: bool,
    pub mailbox_full: bool,
    pub buffer_state: BufferState,
    pub read_buffer_open: bool,
    pub write_buffer_open: bool,
}

impl WireRead for Status {
    const PACKED_LEN: usize = 1;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, Error> {
        let raw = u16::from(u8::unpack_from_slice(buf)?);
        Ok(Self {
            has_write_event: read_bits_u16(raw, 0, 1) != 0,
            has_read_event: read_bits_u16(raw, 1, 1) != 0,
            mailbox_full: read_bits_u16(raw, 3, 1) != 0,
            buffer_state: BufferState::from_u8(read_bits_u16(raw, 4, 2) as u8),
            read_buffer_open: read_bits_u16(raw, 6, 1) != 0,
            write_buffer_open: read_bits_u16(raw, 7, 1) != 0,
        })
    }
}

impl WireWrite for Status {
    fn packed_len(&self) -> usize {
        1
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], Error> {
        let mut raw = write_bits_u16(0, 0, 1, self.has_write_event as u16);
        raw = write_bits_u16(raw, 1, 1, self.has_read_event as u16);
        raw = write_bits_u16(raw, 3, 1, self.mailbox_full as u16);
        raw = write_bits_u16(raw, 4, 2, u16::from(self.buffer_state.as_u8()));
        raw = write_bits_u16(raw, 6, 1, self.read_buffer_open as u16);
        raw = write_bits_u16(raw, 7, 1, self.write_buffer_open as u16);
        (raw as u8).pack_to_slice(buf)
    }
}

/// Described in ETG1000.4 6.7.2 Sync Manager Attributes
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Enable {
    pub enable: bool,
    pub repeat: bool,
    /// DC Event 0 with EtherCAT write.
    ///
    /// Set to `true` to enable DC 0 events on EtherCAT writes.
    pub enable_dc_event_bus_write: bool,
    /// DC Event 0 with local write.
    ///
    /// Set to `true` to enable DC 0 events from local writes.
    pub enable_dc_event_local_write: bool,
    pub channel_pdi_disabled: bool,
    pub repeat_ack: bool,
}

impl WireRead for Enable {
    const PACKED_LEN: usize = 2;

    fn unpack_from_slice(buf: &[u8]) -> Result<Self, Error> {
        let raw = u16::unpack_from_slice(buf)?;
        Ok(Self {
            enable: read_bits_u16(raw, 0, 1) != 0,
            repeat: read_bits_u16(raw, 1, 1) != 0,
            enable_dc_event_bus_write: read_bits_u16(raw, 6, 1) != 0,
            enable_dc_event_local_write: read_bits_u16(raw, 7, 1) != 0,
            channel_pdi_disabled: read_bits_u16(raw, 8, 1) != 0,
            repeat_ack: read_bits_u16(raw, 9, 1) != 0,
        })
    }
}

impl WireWrite for Enable {
    fn packed_len(&self) -> usize {
        2
    }

    fn pack_to_slice<'buf>(&self, buf: &'buf mut [u8]) -> Result<&'buf [u8], Error> {
        let mut raw = write_bits_u16(0, 0, 1, self.enable as u16);
        raw = write_bits_u16(raw, 1, 1, self.repeat as u16);
        raw = write_bits_u16(raw, 6, 1, self.enable_dc_event_bus_write as u16);
        raw = write_bits_u16(raw, 7, 1, self.enable_dc_event_local_write as u16);
        raw = write_bits_u16(raw, 8, 1, self.channel_pdi_disabled as u16);
        raw = write_bits_u16(raw, 9, 1, self.repeat_ack as u16);
        raw.pack_to_slice(buf)
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationMode {
    #[default]
    Normal = 0x00,
    Mailbox = 0x02,
}

impl OperationMode {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0x02 => Self::Mailbox,
            _ => Self::Normal,
        }
    }

    fn as_u8(&self) -> u8 {
        match self {
            Self::Normal => 0x00,
            Self::Mailbox => 0x02,
        }
    }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    #[default]
    MasterRead = 0x00,
    MasterWrite = 0x01,
}

impl Direction {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0x01 => Self::MasterWrite,
            _ => Self::MasterRead,
        }
    }

    fn as_u8(&self) -> u8 {
        match self {
            Self::MasterRead => 0x00,
            Self::MasterWrite => 0x01,
        }
    }
}

/// Buffer state.
///
/// Somewhat described in ETG1000.4 Figure 32 – SyncM mailbox interaction.
///
/// In cyclic mode the buffers need to be tripled. It's unclear why from the spec but that's what it
/// says.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BufferState {
    /// First buffer.
    #[default]
    First = 0x00,
    /// Second buffer.
    Second = 0x01,
    /// Third buffer.
    Third = 0x02,
    /// Next buffer.
    Next = 0x03,
}

impl BufferState {
    fn from_u8(raw: u8) -> Self {
        match raw & 0x03 {
            0x01 => Self::Second,
            0x02 => Self::Third,
            0x03 => Self::Next,
            _ => Self::First,
        }
    }

    fn as_u8(&self) -> u8 {
        match self {
            Self::First => 0x00,
            Self::Second => 0x01,
            Self::Third => 0x02,
            Self::Next => 0x03,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_49_decode_timeout_response() {
        let raw = [0x00u8, 0x1c, 0x00, 0x01, 0x22, 0x00, 0x01, 0x00];

        let parsed = SyncManagerChannel::unpack_from_slice(&raw).unwrap();

        assert_eq!(
            parsed,
            SyncManagerChannel {
                physical_start_address: 0x1c00,
                length_bytes: 0x0100,
                control: Control {
                    operation_mode: OperationMode::Mailbox,
                    direction: Direction::MasterRead,
                    ecat_event_enable: false,
                    dls_user_event_enable: true,
                    watchdog_enable: false,
                },
                status: Status {
                    has_write_event: false,
                    has_read_event: false,
                    mailbox_full: false,
                    buffer_state: BufferState::First,
                    read_buffer_open: false,
                    write_buffer_open: false
                },
                enable: Enable {
                    enable: true,
                    repeat: false,
                    enable_dc_event_bus_write: false,
                    enable_dc_event_local_write: false,
                    channel_pdi_disabled: false,
                    repeat_ack: false
                }
            }
        )
    }

    #[test]
    fn default_is_zero() {
        let mut buf = [0u8; 8];
        SyncManagerChannel::default().pack_to_slice(&mut buf).unwrap();
        assert_eq!(buf, [0u8; 8]);
    }

    #[test]
    fn size() {
        assert_eq!(SyncManagerChannel::default().packed_len(), 8);
    }

    #[test]
    fn decode_control() {
        // Fields are little endian
        // Taken from `soem-single-lan9252.pcap`
        let raw = [0x26];

        let parsed = Control::unpack_from_slice(&raw).unwrap();

        assert_eq!(
            parsed,
            Control {
                operation_mode: OperationMode::Mailbox,
                direction: Direction::MasterWrite,
                ecat_event_enable: false,
                dls_user_event_enable: true,
                watchdog_enable: false,
            },
        )
    }

    #[test]
    fn decode_enable() {
        // Fields are little endian
        // Taken from `soem-single-lan9252.pcap`
        let raw = [0x01, 0x00];

        let parsed = Enable::unpack_from_slice(&raw).unwrap();

        assert_eq!(
            parsed,
            Enable {
                enable: true,
                repeat: false,
                enable_dc_event_bus_write: false,
                enable_dc_event_local_write: false,
                channel_pdi_disabled: false,
                repeat_ack: false,
            }
        )
    }

    #[test]
    fn decode_mailbox_event() {
        let raw = [0x09];

        let parsed = Status::unpack_from_slice(&raw).unwrap();

        assert!(parsed.mailbox_full)
    }

    #[test]
    fn encode_enable() {
        let mut buf = [0u8; 2];

        let raw = Enable {
            enable: true,
            repeat: false,
            enable_dc_event_bus_write: false,
            enable_dc_event_local_write: false,
            channel_pdi_disabled: false,
            repeat_ack: false,
        }
        .pack_to_slice(&mut buf)
        .unwrap();

        assert_eq!(raw, &[0x01, 0x00])
    }

    #[test]
    fn decode_one() {
        // Fields are little endian
        // Taken from `soem-single-lan9252.pcap`
        let raw = [
            // Start address
            0x00, 0x10, //
            // Length
            0x80, 0x00, //
            // Control
            0x26, //
            // Status
            0x00, //
            // Enable
            0x01, 0x00,
        ];

        let parsed = SyncManagerChannel::unpack_from_slice(&raw).unwrap();

        assert_eq!(
            parsed,
            SyncManagerChannel {
                physical_start_address: 0x1000,
                length_bytes: 0x0080,
                control: Control {
                    operation_mode: OperationMode::Mailbox,
                    direction: Direction::MasterWrite,
                    ecat_event_enable: false,
                    dls_user_event_enable: true,
                    watchdog_enable: false,
                },
                status: Status {
                    has_write_event: false,
                    has_read_event: false,
                    mailbox_full: false,
                    buffer_state: BufferState::First,
                    read_buffer_open: false,
                    write_buffer_open: false,
                },
                enable: Enable {
                    enable: true,
                    repeat: false,
                    enable_dc_event_bus_write: false,
                    enable_dc_event_local_write: false,
                    channel_pdi_disabled: false,
                    repeat_ack: false,
                }
            }
        )
    }
}
