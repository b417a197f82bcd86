//! Application-facing constructor for an FoE file read.
//!
//! Only single-block transfers are modelled: the FSM sends one read request, accepts one `Data`
//! reply, acknowledges it, and completes. A file too large for one mailbox frame surfaces as
//! `Error::BufferTooSmall` rather than continuing across further blocks.

use crate::error::Error;
use crate::request::{Request, RequestKind};

/// Build a file-read request for `filename`, which travels in as the request's payload until the
/// FSM overwrites it with the file's contents.
pub fn read_file(slave_position: u16, filename: &[u8], expected_len: usize) -> Result<Request, Error> {
    Request::with_payload(RequestKind::FoeRead, slave_position, expected_len, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_travels_as_payload() {
        let req = read_file(3, b"config.bin", 128).unwrap();
        assert_eq!(&req.payload()[..], b"config.bin");
    }
}
