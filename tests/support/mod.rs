//! Shared low-level helpers for the end-to-end scenario tests: frame-layout constants and a
//! decoder for the one outgoing datagram each test's virtual link needs to answer.
//!
//! Grounded on `frame.rs`'s wire layout and the `LoopbackLink`-style test doubles scattered
//! through the crate's own `#[cfg(test)]` modules: a link device that inspects what it was asked
//! to transmit and echoes back a plausible reply rather than routing real bytes anywhere.

use ecat_master::Command;

pub const FRAME_HEADER_LEN: usize = 2;
pub const DATAGRAM_HEADER_LEN: usize = 10;
pub const WORKING_COUNTER_LEN: usize = 2;

/// One decoded outgoing datagram: the command it carries, and where its payload lives within the
/// frame buffer. Every scenario here sends a single datagram per frame, so only the first one is
/// decoded.
pub struct Outgoing {
    pub command: Command,
    pub payload_start: usize,
    pub payload_len: usize,
}

pub fn decode_first(frame: &[u8]) -> Outgoing {
    let command_code = frame[2];
    let mut addr = [0u8; 4];
    addr.copy_from_slice(&frame[4..8]);
    let len_word = u16::from_le_bytes([frame[8], frame[9]]);
    let payload_len = (len_word & 0x07ff) as usize;

    Outgoing {
        command: Command::parse_code_address(command_code, addr).expect("known command code"),
        payload_start: FRAME_HEADER_LEN + DATAGRAM_HEADER_LEN,
        payload_len,
    }
}

/// Overwrite a frame's trailing working counter in place, leaving everything else (including
/// whatever payload bytes a reply wrote in) untouched.
pub fn set_working_counter(frame: &mut [u8], wkc: u16) {
    let len = frame.len();
    frame[len - WORKING_COUNTER_LEN..].copy_from_slice(&wkc.to_le_bytes());
}
