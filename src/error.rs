//! Master error types.

pub use crate::mailbox::coe::abort_code::CoeAbortCode;
use crate::command::Command;
use core::num::TryFromIntError;

/// A master error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Error {
    /// No slave, domain, config or request matched a lookup.
    NotFound {
        /// Item kind.
        item: Item,
        /// An index into a list of items, when relevant.
        index: Option<usize>,
    },

    /// An argument was out of range or otherwise invalid.
    InvalidArgument,

    /// The operation cannot proceed right now; retry later.
    Again,

    /// A datagram was not answered within the engine timeout.
    Timeout,

    /// A received frame failed structural validation.
    Corrupted(PduValidationError),

    /// A reply arrived with no pending datagram of matching kind.
    Unmatched {
        /// Index carried by the unmatched reply.
        index: u8,
    },

    /// A CoE SDO abort code was returned by a slave.
    Abort(CoeAbortCode),

    /// A protocol-level error code was returned by a slave (e.g. SoE).
    ProtocolError(u16),

    /// A caller-supplied buffer was smaller than the data being copied into it.
    BufferTooSmall {
        /// Buffer capacity.
        capacity: usize,
        /// Required length.
        required: usize,
    },

    /// A blocking wait was interrupted before work began.
    Interrupted,

    /// A fixed-capacity allocation failed during setup.
    OutOfMemory,

    /// The link device reported the link as down.
    LinkDown,

    /// A low level error occurred when producing or consuming a PDU.
    Pdu(PduError),

    /// A working counter (WKC) mismatch was encountered.
    WorkingCounter {
        /// The expected working counter value.
        expected: u16,
        /// The actual value received.
        received: u16,
    },

    /// An EEPROM (SII) error was encountered.
    Eeprom(EepromError),

    /// A mailbox error was encountered.
    Mailbox(MailboxError),

    /// A value could not be converted into a target integer type.
    IntegerTypeConversion,

    /// There is a problem with the discovered ring topology.
    Topology,

    /// A slave failed to transition to a requested AL state.
    StateTransition,
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotFound { item, index } => {
                write!(f, "{:?} not found (index: {:?})", item, index)
            }
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::Again => f.write_str("resource busy, try again"),
            Error::Timeout => f.write_str("timeout"),
            Error::Corrupted(e) => write!(f, "corrupted frame: {}", e),
            Error::Unmatched { index } => write!(f, "no pending datagram for index {}", index),
            Error::Abort(code) => write!(f, "aborted: {}", code),
            Error::ProtocolError(code) => write!(f, "protocol error {:#06x}", code),
            Error::BufferTooSmall {
                capacity,
                required,
            } => write!(
                f,
                "buffer of {} bytes too small, need {}",
                capacity, required
            ),
            Error::Interrupted => f.write_str("interrupted while waiting"),
            Error::OutOfMemory => f.write_str("out of memory"),
            Error::LinkDown => f.write_str("link is down"),
            Error::Pdu(e) => write!(f, "pdu: {}", e),
            Error::WorkingCounter { expected, received } => {
                write!(f, "working counter expected {}, got {}", expected, received)
            }
            Error::Eeprom(e) => write!(f, "eeprom: {}", e),
            Error::Mailbox(e) => write!(f, "mailbox: {e}"),
            Error::IntegerTypeConversion => write!(f, "failed to convert between integer types"),
            Error::Topology => f.write_str("ring topology error"),
            Error::StateTransition => f.write_str("a slave failed to transition AL state"),
        }
    }
}

/// The kind of item being looked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Item {
    /// A slave.
    Slave,
    /// A slave configuration.
    SlaveConfig,
    /// A process data domain.
    Domain,
    /// A pending request.
    Request,
    /// A link device.
    Link,
}

/// Low level PDU (datagram) error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PduError {
    /// Failed to decode raw PDU data into a given type.
    Decode,
    /// Something went wrong encoding/decoding the Ethernet II frame.
    Ethernet,
    /// PDU data is too long to fit in the given buffer.
    TooLong,
    /// Failed to create an Ethernet II frame.
    CreateFrame,
    /// A frame index was given that does not point to a frame.
    InvalidIndex(u8),
    /// A received frame is invalid.
    Validation(PduValidationError),
    /// No free index is currently available on this link.
    NoFreeIndex,
}

impl core::fmt::Display for PduError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PduError::Decode => f.write_str("failed to decode raw PDU data into type"),
            PduError::Ethernet => f.write_str("network"),
            PduError::TooLong => f.write_str("data is too long to fit in given buffer"),
            PduError::CreateFrame => f.write_str("failed to create frame"),
            PduError::InvalidIndex(index) => write!(f, "invalid PDU index {}", index),
            PduError::Validation(e) => write!(f, "received PDU validation failed: {}", e),
            PduError::NoFreeIndex => f.write_str("no free datagram index on this link"),
        }
    }
}

/// Mailbox protocol error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MailboxError {
    /// The mailbox operation was aborted.
    Aborted {
        /// Abort code.
        code: CoeAbortCode,
        /// The index used in the operation.
        index: u16,
        /// The subindex used in the operation.
        sub_index: u8,
    },
    /// Mailbox data is too long to fit in the given type.
    TooLong {
        /// The index used in the operation.
        index: u16,
        /// The subindex used in the operation.
        sub_index: u8,
    },
    /// A slave has no mailbox but one is required for a given action.
    NoMailbox,
    /// The reply to a mailbox action is invalid.
    ResponseInvalid {
        /// The index used in the operation.
        index: u16,
        /// The subindex used in the operation.
        sub_index: u8,
    },
    /// The returned counter value does not match the one sent.
    InvalidCount,
    /// A slave sent an emergency message.
    Emergency {
        /// Error code.
        error_code: u16,
        /// Error register.
        error_register: u8,
    },
}

impl core::fmt::Display for MailboxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MailboxError::Aborted {
                code,
                index,
                sub_index,
            } => write!(f, "{:#06x}:{} aborted: {}", index, sub_index, code),
            MailboxError::TooLong { index, sub_index } => {
                write!(f, "{:#06x}:{} returned data is too long", index, sub_index)
            }
            MailboxError::NoMailbox => f.write_str("slave has no mailbox"),
            MailboxError::ResponseInvalid { index, sub_index } => {
                write!(f, "{:#06x}:{} invalid response from slave", index, sub_index)
            }
            MailboxError::InvalidCount => f.write_str("incorrect mailbox counter value"),
            MailboxError::Emergency {
                error_code,
                error_register,
            } => write!(
                f,
                "emergency: code {:#06x}, register {:#04x}",
                error_code, error_register
            ),
        }
    }
}

/// EEPROM (SII) error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EepromError {
    /// Failed to decode data read from the EEPROM.
    Decode,
    /// An EEPROM section is too large to fit in the given buffer.
    SectionOverrun,
    /// The given category does not exist in the slave's EEPROM.
    NoCategory,
    /// The section in the slave's EEPROM is too small to fill the given buffer.
    SectionUnderrun,
}

impl core::fmt::Display for EepromError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EepromError::Decode => f.write_str("failed to decode data"),
            EepromError::SectionOverrun => f.write_str("section too large to fit in buffer"),
            EepromError::NoCategory => f.write_str("category not found"),
            EepromError::SectionUnderrun => f.write_str("section too short to fill buffer"),
        }
    }
}

/// A received PDU failed to validate against the one that was sent.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PduValidationError {
    /// The index of the received PDU does not match that of the sent one.
    IndexMismatch {
        /// Sent index.
        sent: u8,
        /// Received index.
        received: u8,
    },
    /// The received command does not match the one sent.
    CommandMismatch {
        /// Sent command.
        sent: Command,
        /// Received command.
        received: Command,
    },
    /// The frame's declared length field does not match the data actually received.
    LengthMismatch {
        /// Declared length.
        declared: usize,
        /// Actual length.
        actual: usize,
    },
}

impl core::fmt::Display for PduValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IndexMismatch { sent, received } => {
                write!(
                    f,
                    "PDU index mismatch: sent {}, received {}",
                    sent, received
                )
            }
            Self::CommandMismatch { sent, received } => {
                write!(
                    f,
                    "PDU command mismatch: sent {}, received {}",
                    sent, received
                )
            }
            Self::LengthMismatch { declared, actual } => {
                write!(
                    f,
                    "frame length mismatch: declared {}, actual {}",
                    declared, actual
                )
            }
        }
    }
}

impl From<PduError> for Error {
    fn from(e: PduError) -> Self {
        Self::Pdu(e)
    }
}

impl From<EepromError> for Error {
    fn from(e: EepromError) -> Self {
        Self::Eeprom(e)
    }
}

impl From<MailboxError> for Error {
    fn from(e: MailboxError) -> Self {
        Self::Mailbox(e)
    }
}

impl From<PduValidationError> for PduError {
    fn from(e: PduValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<PduValidationError> for Error {
    fn from(e: PduValidationError) -> Self {
        Self::Corrupted(e)
    }
}

impl From<TryFromIntError> for Error {
    fn from(_e: TryFromIntError) -> Self {
        crate::fmt::error!("integer conversion error");

        Self::IntegerTypeConversion
    }
}
